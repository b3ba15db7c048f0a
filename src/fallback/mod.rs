//! Fallback cache around GET-style retrievals
//!
//! [`FallbackCache::orchestrate`] wraps a single retrieval:
//!
//! - a stored entity tag is sent as `If-None-Match`
//! - a 2xx response is stored together with its entity tag
//! - a 304 is answered from the cache
//! - a 404 is passed through untouched
//! - any other status, or a transport failure, is answered from the cache
//!   when possible
//!
//! Degraded answers are reported through a [`ThrottledLogger`] so a recurring
//! outage logs once per cooldown window rather than once per request.

pub mod key;
pub mod response;
pub mod throttle;

pub use key::{canonicalize, content_key};
pub use response::{RawResponse, Response};
pub use throttle::{
    FallbackEvent, ThrottledLogger, MESSAGE_CACHE_HIT, MESSAGE_CACHE_MISS, MESSAGE_NOT_FOUND,
};

use std::future::Future;

use tracing::{debug, warn};

use crate::auth::ETagCacheControl;
use crate::cache::CacheStore;
use crate::config::FallbackConfig;
use crate::error::ClientError;

/// What the wrapped retrieval is asked to fetch
#[derive(Debug, Clone)]
pub struct RetrieveRequest {
    pub url: String,
    pub params: Vec<(String, String)>,
    /// Conditional-request header derived from the stored entity tag
    pub cache_control: Option<ETagCacheControl>,
}

/// Serves cached content when live retrieval fails, and keeps the cache fresh
/// when it succeeds
#[derive(Debug, Clone)]
pub struct FallbackCache<S> {
    store: S,
    config: FallbackConfig,
    logger: ThrottledLogger<S>,
}

impl<S: CacheStore + Clone> FallbackCache<S> {
    pub fn new(store: S, config: FallbackConfig) -> Self {
        let logger = ThrottledLogger::new(store.clone(), config.log_throttle);
        Self {
            store,
            config,
            logger,
        }
    }
}

impl<S: CacheStore> FallbackCache<S> {
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }

    pub fn logger(&self) -> &ThrottledLogger<S> {
        &self.logger
    }

    /// Runs `retrieve` for `url` and `params` under the fallback policy.
    ///
    /// `url` names the cache entry, so it should be absolute whenever one
    /// store serves more than one origin.
    ///
    /// Returns an error only when the retrieval could not complete and
    /// nothing is cached, or when the retrieval failed for a reason other
    /// than transport (for instance a malformed URL).
    pub async fn orchestrate<F, Fut>(
        &self,
        url: &str,
        params: &[(String, String)],
        retrieve: F,
    ) -> Result<Response, ClientError>
    where
        F: FnOnce(RetrieveRequest) -> Fut,
        Fut: Future<Output = Result<RawResponse, ClientError>>,
    {
        let cache_key = key::content_key(url, params);
        let validator_key = key::validator_key(&cache_key);

        let cache_control = self
            .store
            .get(&validator_key)
            .and_then(|v| String::from_utf8(v).ok())
            .map(ETagCacheControl::new);

        let request = RetrieveRequest {
            url: url.to_string(),
            params: params.to_vec(),
            cache_control,
        };

        let raw = match retrieve(request).await {
            Ok(raw) => raw,
            Err(e) if e.is_transport() => {
                return match self.store.get(&cache_key) {
                    Some(cached) => {
                        self.logger.emit(&FallbackEvent::CacheHit {
                            url: url.to_string(),
                            status_code: None,
                        });
                        Ok(Response::Cache(cached))
                    }
                    None => Err(e),
                };
            }
            Err(e) => return Err(e),
        };

        match raw.status {
            404 => {
                self.logger.emit(&FallbackEvent::NotFound {
                    url: url.to_string(),
                    status_code: raw.status,
                });
                Ok(Response::Live(raw))
            }
            304 => match self.store.get(&cache_key) {
                Some(cached) => {
                    debug!(url, "not modified, serving cached content");
                    Ok(Response::Cache(cached))
                }
                None => {
                    // Content expired or was evicted after the validator was read
                    self.logger.emit(&FallbackEvent::CacheMiss {
                        url: url.to_string(),
                        status_code: raw.status,
                    });
                    Ok(Response::Failure(raw))
                }
            },
            _ if raw.is_success() => {
                self.persist(cache_key, validator_key, &raw);
                Ok(Response::Live(raw))
            }
            _ => match self.store.get(&cache_key) {
                Some(cached) => {
                    self.logger.emit(&FallbackEvent::CacheHit {
                        url: url.to_string(),
                        status_code: Some(raw.status),
                    });
                    Ok(Response::Cache(cached))
                }
                None => {
                    self.logger.emit(&FallbackEvent::CacheMiss {
                        url: url.to_string(),
                        status_code: raw.status,
                    });
                    Ok(Response::Failure(raw))
                }
            },
        }
    }

    /// Stores content and validator together. A response without an entity
    /// tag clears any validator left over from an earlier fetch.
    fn persist(&self, cache_key: String, validator_key: String, raw: &RawResponse) {
        let entries = [
            (cache_key, Some(raw.body.clone())),
            (validator_key, raw.etag().map(|etag| etag.as_bytes().to_vec())),
        ];
        if let Err(e) = self.store.set_many(&entries, self.config.cache_expire) {
            warn!(url = %raw.url, error = %e, "failed to store fallback content");
        }
    }
}
