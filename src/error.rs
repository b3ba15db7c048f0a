//! Error types for the API client and its cache stores

use thiserror::Error;

/// Errors that can occur when talking to the remote API
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not complete (connection refused, timeout, reset,
    /// truncated body). This is the only error the fallback cache recovers from.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The base URL or request path could not be turned into an absolute URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Failed to encode or decode a JSON payload
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A header value contained characters that cannot be sent
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// The response carried a 4xx or 5xx status
    #[error("HTTP {status} for {url}")]
    Status {
        /// The failing status code
        status: u16,
        /// The URL that produced it
        url: String,
    },

    /// Neither a bearer token nor an SSO session id was supplied
    #[error("No credentials supplied: need a bearer token or an SSO session id")]
    MissingCredentials,
}

impl ClientError {
    /// Whether this error is a transport failure, as opposed to a mistake in
    /// how the request was put together.
    pub fn is_transport(&self) -> bool {
        match self {
            ClientError::Transport(e) => !e.is_builder(),
            _ => false,
        }
    }
}

/// Errors raised by a cache store backend
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the backing storage failed
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored entry could not be encoded or decoded
    #[error("Cache entry is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}
