//! Client and fallback cache configuration
//!
//! Both structs are plain values built with `with_*` methods. The binary
//! fills them from command-line flags, which fall back to `FALLBACK_CLIENT_*`
//! environment variables.

use std::time::Duration;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default lifetime of cached content and validators in seconds
pub const DEFAULT_CACHE_EXPIRE_SECS: u64 = 60 * 60 * 24 * 30;

/// Default cooldown between repeated fallback log lines (24 hours)
pub const DEFAULT_LOG_THROTTLE_SECS: u64 = 60 * 60 * 24;

/// Connection and signing settings for an [`ApiClient`](crate::ApiClient)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request path is joined onto
    pub base_url: String,
    /// Shared secret used to sign requests
    pub api_key: String,
    /// Identifier sent alongside the signature
    pub sender_id: String,
    /// Per-request timeout; expiry surfaces as a transport failure
    pub timeout: Duration,
    /// API version advertised in the User-Agent header
    pub version: String,
}

impl ClientConfig {
    /// Creates a config with the default timeout and version "1"
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        sender_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            sender_id: sender_id.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            version: "1".to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Lifetimes used by the fallback cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackConfig {
    /// TTL for content and validator entries, applied on every write
    pub cache_expire: Duration,
    /// Cooldown during which a repeated (message, url) log line is suppressed
    pub log_throttle: Duration,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            cache_expire: Duration::from_secs(DEFAULT_CACHE_EXPIRE_SECS),
            log_throttle: Duration::from_secs(DEFAULT_LOG_THROTTLE_SECS),
        }
    }
}

impl FallbackConfig {
    pub fn with_cache_expire_seconds(mut self, secs: u64) -> Self {
        self.cache_expire = Duration::from_secs(secs);
        self
    }

    /// Zero falls back to the 24 hour default, matching an unset value.
    pub fn with_log_throttle_seconds(mut self, secs: u64) -> Self {
        self.log_throttle = if secs == 0 {
            Duration::from_secs(DEFAULT_LOG_THROTTLE_SECS)
        } else {
            Duration::from_secs(secs)
        };
        self
    }
}
