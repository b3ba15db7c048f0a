//! Authentication and cache-control header contributors
//!
//! Anything that adds headers to an outgoing request implements
//! [`HeaderContributor`]. The client merges contributions in a fixed order
//! (auth, then cache control, then content type) so a later contributor wins
//! on a name clash.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, IF_NONE_MATCH};

use crate::error::ClientError;

/// Something that contributes headers to an outgoing request
pub trait HeaderContributor {
    fn headers(&self) -> Result<HeaderMap, ClientError>;
}

/// Credentials presented in the `Authorization` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authenticator {
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// `Authorization: SSO_SESSION_ID <session id>`
    SessionSso(String),
}

impl Authenticator {
    /// Picks an authenticator from whichever credential is present.
    ///
    /// A bearer token takes precedence over an SSO session id. Empty strings
    /// count as absent.
    pub fn negotiate(
        bearer_token: Option<&str>,
        sso_session_id: Option<&str>,
    ) -> Result<Self, ClientError> {
        let present = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_string);

        if let Some(token) = present(bearer_token) {
            return Ok(Self::Bearer(token));
        }
        if let Some(session_id) = present(sso_session_id) {
            return Ok(Self::SessionSso(session_id));
        }
        Err(ClientError::MissingCredentials)
    }

    /// The raw credential value
    pub fn value(&self) -> &str {
        match self {
            Self::Bearer(v) | Self::SessionSso(v) => v,
        }
    }

    fn scheme(&self) -> &'static str {
        match self {
            Self::Bearer(_) => "Bearer",
            Self::SessionSso(_) => "SSO_SESSION_ID",
        }
    }
}

impl HeaderContributor for Authenticator {
    fn headers(&self) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("{} {}", self.scheme(), self.value()))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

/// Conditional-request header built from a stored entity tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ETagCacheControl(pub String);

impl ETagCacheControl {
    pub fn new(etag: impl Into<String>) -> Self {
        Self(etag.into())
    }
}

impl HeaderContributor for ETagCacheControl {
    fn headers(&self) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(IF_NONE_MATCH, HeaderValue::from_str(&self.0)?);
        Ok(headers)
    }
}
