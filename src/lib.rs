//! Fallback Client Library
//!
//! A signed API client with pluggable authentication headers and a
//! stale-while-revalidate fallback cache around GET requests.

pub mod auth;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod fallback;
pub mod signing;

pub use auth::{Authenticator, ETagCacheControl, HeaderContributor};
pub use cache::{CacheStore, FileStore, MemoryStore};
pub use client::{ApiClient, ApiRequest, CachedApiClient};
pub use config::{ClientConfig, FallbackConfig};
pub use error::{CacheError, ClientError};
pub use fallback::{FallbackCache, FallbackEvent, RawResponse, Response, ThrottledLogger};
pub use signing::RequestSigner;
