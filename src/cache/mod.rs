//! Cache stores backing the fallback cache
//!
//! A store is a key to bytes mapping where every entry carries its own expiry.
//! The fallback cache only needs three operations: read a key, write several
//! keys with one TTL, and store a key only if it is absent. Two backends are
//! provided: an in-process [`MemoryStore`] and a disk-backed [`FileStore`]
//! that persists entries across runs.

mod file;
mod memory;

pub use file::{CachedData, FileStore};
pub use memory::MemoryStore;

use std::sync::Arc;
use std::time::Duration;

use crate::error::CacheError;

/// Key/value store with per-entry expiry
///
/// Implementations must be safe to share between tasks; each operation is
/// atomic with respect to the others for a single key.
pub trait CacheStore: Send + Sync {
    /// Returns the value for `key`, or `None` if it is missing or expired
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Writes every entry with the same TTL. A `None` value removes the key.
    fn set_many(&self, entries: &[(String, Option<Vec<u8>>)], ttl: Duration) -> Result<(), CacheError>;

    /// Stores `value` only if `key` is absent (or expired).
    ///
    /// Returns `true` if this call stored the entry.
    fn add(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, CacheError>;
}

impl<S: CacheStore + ?Sized> CacheStore for Arc<S> {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        (**self).get(key)
    }

    fn set_many(&self, entries: &[(String, Option<Vec<u8>>)], ttl: Duration) -> Result<(), CacheError> {
        (**self).set_many(entries, ttl)
    }

    fn add(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, CacheError> {
        (**self).add(key, value, ttl)
    }
}
