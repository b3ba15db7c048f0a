//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use fallback_client::fallback::{content_key, key::validator_key};
use fallback_client::{ApiClient, CachedApiClient, ClientConfig, FallbackConfig, MemoryStore};

/// Path requested by the cached client in most tests
pub const PATH: &str = "/some/path/thing/";

/// A base URL nothing listens on
pub const DEAD_ORIGIN: &str = "http://127.0.0.1:1";

/// A log event recorded from this crate
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub url: Option<String>,
    pub status_code: Option<u64>,
}

/// Collects events emitted by `fallback_client` while the guard is held
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    /// Installs the capture as the thread's default subscriber
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let guard = tracing_subscriber::registry()
            .with(capture.clone())
            .set_default();
        (capture, guard)
    }

    /// ERROR events in emission order
    pub fn errors(&self) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == Level::ERROR)
            .cloned()
            .collect()
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    url: Option<String>,
    status_code: Option<u64>,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "url" => self.url = Some(value.to_string()),
            "message" => self.message = value.to_string(),
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "status_code" {
            self.status_code = Some(value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{:?}", value),
            "url" => self.url = Some(format!("{:?}", value)),
            _ => {}
        }
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with("fallback_client") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *metadata.level(),
            message: visitor.message,
            url: visitor.url,
            status_code: visitor.status_code,
        });
    }
}

pub fn params() -> Vec<(String, String)> {
    vec![
        ("x".to_string(), "y".to_string()),
        ("a".to_string(), "b".to_string()),
    ]
}

/// `PATH` joined onto `base_url`, as it appears in log lines
pub fn absolute_url(base_url: &str) -> String {
    ApiClient::build_url(base_url, PATH)
        .expect("valid base url")
        .to_string()
}

/// Store key of the content for `PATH` with `params()` on `base_url`
pub fn cache_key(base_url: &str) -> String {
    content_key(&absolute_url(base_url), &params())
}

/// Store key of the entity tag for `cache_key(base_url)`
pub fn etag_key(base_url: &str) -> String {
    validator_key(&cache_key(base_url))
}

pub fn api_client(base_url: &str) -> ApiClient {
    let config = ClientConfig::new(base_url, "debug", "test-sender")
        .with_timeout(Duration::from_secs(5));
    ApiClient::new(config).expect("client should build")
}

/// Cached client over a shared in-memory store
pub fn cached_client(
    base_url: &str,
    store: Arc<MemoryStore>,
    config: FallbackConfig,
) -> CachedApiClient<Arc<MemoryStore>> {
    CachedApiClient::new(api_client(base_url), store, config)
}
