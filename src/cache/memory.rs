//! In-process cache store

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use moka::Expiry;

use super::CacheStore;
use crate::error::CacheError;

/// Longest lifetime an entry is given; larger TTLs are clamped to it
const MAX_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 100);

#[derive(Debug, Clone)]
struct Stored {
    value: Arc<[u8]>,
    ttl: Duration,
}

impl Stored {
    fn new(value: &[u8], ttl: Duration) -> Self {
        Self {
            value: Arc::from(value),
            ttl: ttl.min(MAX_TTL),
        }
    }
}

/// Expires each entry after the TTL it was written with
struct PerEntryTtl;

impl Expiry<String, Stored> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Stored, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Stored,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Cache store held in process memory
///
/// Backed by a `moka` cache with a per-entry expiry, so expired entries are
/// evicted by its housekeeping even when their keys are never read again.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Cache<String, Stored>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().expire_after(PerEntryTtl).build(),
        }
    }

    /// Removes every entry
    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }

    /// Number of entries that have not expired
    pub fn len(&self) -> usize {
        self.entries.run_pending_tasks();
        self.entries.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entry_count", &self.entries.entry_count())
            .finish()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).map(|stored| stored.value.to_vec())
    }

    fn set_many(&self, items: &[(String, Option<Vec<u8>>)], ttl: Duration) -> Result<(), CacheError> {
        for (key, value) in items {
            match value {
                Some(value) => self.entries.insert(key.clone(), Stored::new(value, ttl)),
                None => self.entries.invalidate(key),
            }
        }
        Ok(())
    }

    fn add(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, CacheError> {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Stored::new(value, ttl));
        Ok(entry.is_fresh())
    }
}
