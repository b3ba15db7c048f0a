//! Noise-throttled logging for fallback events
//!
//! A recurring outage would otherwise log the same line on every request.
//! Before an event is emitted, a marker keyed by its (message, url) pair is
//! stored with `add`; only the call that stores the marker gets to log. The
//! marker expires after the cooldown and the next occurrence logs again.

use std::time::Duration;

use tracing::{debug, error, warn};

use super::key::throttle_key;
use crate::cache::CacheStore;

pub const MESSAGE_CACHE_HIT: &str = "Fallback cache hit. Using cached content.";
pub const MESSAGE_CACHE_MISS: &str = "Fallback cache miss. Cannot use any content.";
pub const MESSAGE_NOT_FOUND: &str = "Resource not found.";

/// A fallback condition worth reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackEvent {
    /// Cached content is served in place of a failed live call.
    /// `status_code` is absent when the call did not complete at all.
    CacheHit { url: String, status_code: Option<u16> },
    /// The live call failed and there was nothing cached to serve
    CacheMiss { url: String, status_code: u16 },
    /// The origin answered 404
    NotFound { url: String, status_code: u16 },
}

impl FallbackEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FallbackEvent::CacheHit { .. } => "CACHE_HIT",
            FallbackEvent::CacheMiss { .. } => "CACHE_MISS",
            FallbackEvent::NotFound { .. } => "NOT_FOUND",
        }
    }

    /// Fixed message text; also part of the throttle key
    pub fn message(&self) -> &'static str {
        match self {
            FallbackEvent::CacheHit { .. } => MESSAGE_CACHE_HIT,
            FallbackEvent::CacheMiss { .. } => MESSAGE_CACHE_MISS,
            FallbackEvent::NotFound { .. } => MESSAGE_NOT_FOUND,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            FallbackEvent::CacheHit { url, .. }
            | FallbackEvent::CacheMiss { url, .. }
            | FallbackEvent::NotFound { url, .. } => url,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            FallbackEvent::CacheHit { status_code, .. } => *status_code,
            FallbackEvent::CacheMiss { status_code, .. }
            | FallbackEvent::NotFound { status_code, .. } => Some(*status_code),
        }
    }
}

/// Emits fallback events at ERROR level, at most once per (message, url)
/// per cooldown window
#[derive(Debug, Clone)]
pub struct ThrottledLogger<S> {
    store: S,
    cooldown: Duration,
}

impl<S: CacheStore> ThrottledLogger<S> {
    pub fn new(store: S, cooldown: Duration) -> Self {
        Self { store, cooldown }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Whether a line with this message and url may be emitted now.
    ///
    /// Claims the cooldown window as a side effect. If the store fails the
    /// line is emitted.
    pub fn should_emit(&self, message: &str, url: &str) -> bool {
        let key = throttle_key(message, url);
        match self.store.add(&key, b"", self.cooldown) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "log throttle store unavailable");
                true
            }
        }
    }

    /// Logs the event unless an identical one was logged within the cooldown.
    ///
    /// Returns whether the event was emitted.
    pub fn emit(&self, event: &FallbackEvent) -> bool {
        if !self.should_emit(event.message(), event.url()) {
            debug!(event = event.name(), url = event.url(), "fallback log suppressed");
            return false;
        }

        match event.status_code() {
            Some(status_code) => error!(
                event = event.name(),
                url = event.url(),
                status_code,
                "{}",
                event.message()
            ),
            None => error!(event = event.name(), url = event.url(), "{}", event.message()),
        }
        true
    }
}
