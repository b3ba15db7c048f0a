//! Responses returned by the client and the fallback cache

use reqwest::header::{HeaderMap, ETAG};
use serde::de::DeserializeOwned;

use crate::error::ClientError;

/// A fully read HTTP response as returned by the dispatcher
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Final URL of the request
    pub url: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Reads the whole body of a reqwest response
    pub async fn read(response: reqwest::Response) -> Result<Self, ClientError> {
        let url = response.url().to_string();
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(Self {
            url,
            status,
            headers,
            body,
        })
    }

    /// The entity tag sent by the origin, if any
    pub fn etag(&self) -> Option<&str> {
        self.headers.get(ETAG).and_then(|v| v.to_str().ok())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outcome of a request, tagged with where its content came from
#[derive(Debug, Clone)]
pub enum Response {
    /// Content came from the origin during this call
    Live(RawResponse),
    /// Content came from the cache, after a 304 or while the origin was failing
    Cache(Vec<u8>),
    /// The origin answered with an unusable status and nothing was cached
    Failure(RawResponse),
}

impl Response {
    pub fn content(&self) -> &[u8] {
        match self {
            Response::Live(raw) | Response::Failure(raw) => &raw.body,
            Response::Cache(content) => content,
        }
    }

    /// Cached content is always reported as 200
    pub fn status_code(&self) -> u16 {
        match self {
            Response::Live(raw) | Response::Failure(raw) => raw.status,
            Response::Cache(_) => 200,
        }
    }

    /// The dispatcher's response; absent for cached content
    pub fn raw_response(&self) -> Option<&RawResponse> {
        match self {
            Response::Live(raw) | Response::Failure(raw) => Some(raw),
            Response::Cache(_) => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Response::Live(_))
    }

    pub fn is_cache(&self) -> bool {
        matches!(self, Response::Cache(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Response::Failure(_))
    }

    /// Short label for the variant, used in logs and CLI output
    pub fn source(&self) -> &'static str {
        match self {
            Response::Live(_) => "live",
            Response::Cache(_) => "cache",
            Response::Failure(_) => "failure",
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(self.content())?)
    }

    /// Content as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.content()).into_owned()
    }

    /// Turns a 4xx or 5xx status into an error, whatever the variant
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        let status = self.status_code();
        if (400..600).contains(&status) {
            let url = self
                .raw_response()
                .map(|raw| raw.url.clone())
                .unwrap_or_default();
            return Err(ClientError::Status { status, url });
        }
        Ok(self)
    }
}
