//! Disk-backed cache store
//!
//! Provides a `FileStore` that keeps each entry in its own JSON file with
//! expiry timestamps, so cached responses survive between runs.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::CacheStore;
use crate::error::CacheError;

/// Lock file serializing `add` across threads and processes
const ADD_LOCK_FILE: &str = ".add.lock";

/// Wrapper struct for a cache entry stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    /// The original key, kept for inspection since file names are hashed
    key: String,
    /// Base64 of the cached bytes
    data: String,
    /// When the data was cached
    cached_at: DateTime<Utc>,
    /// When the cache entry expires
    expires_at: DateTime<Utc>,
}

/// Result of reading an entry, including metadata about its freshness
#[derive(Debug)]
pub struct CachedData {
    /// The cached bytes
    pub data: Vec<u8>,
    /// When the data was originally cached
    pub cached_at: DateTime<Utc>,
    /// Whether the cache entry has expired
    pub is_expired: bool,
}

/// Stores cache entries as JSON files on disk
///
/// Entries live in an XDG-compliant cache directory
/// (`~/.cache/fallback-client/` on Linux). File names are the SHA-256 of the
/// key, since keys are URLs and may contain any character.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl FileStore {
    /// Creates a FileStore using the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "fallback-client")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a FileStore with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// Returns the path to the cache file for the given key
    fn cache_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.cache_dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Unique sibling path for staging a write to `path`
    fn temp_path(path: &Path) -> PathBuf {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        path.with_extension(format!("{suffix}.tmp"))
    }

    /// Writes to a temp file and renames it over `path`, so readers see the
    /// old entry or the new one and never a partial file
    fn write_atomic(path: &Path, contents: &str) -> Result<(), CacheError> {
        let temp_path = Self::temp_path(path);
        if let Err(e) = fs::write(&temp_path, contents).and_then(|()| fs::rename(&temp_path, path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    fn encode_entry(key: &str, value: &[u8], ttl: std::time::Duration) -> Result<String, CacheError> {
        let now = Utc::now();
        let ttl = Duration::from_std(ttl).unwrap_or(Duration::MAX);
        let entry = CacheEntry {
            key: key.to_string(),
            data: BASE64.encode(value),
            cached_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        Ok(serde_json::to_string_pretty(&entry)?)
    }

    /// Reads an entry, expired or not
    ///
    /// Returns `None` if the entry doesn't exist or cannot be parsed, in
    /// which case `add` treats the key as free. Expired entries come back
    /// with `is_expired = true`.
    pub fn read(&self, key: &str) -> Option<CachedData> {
        let content = fs::read_to_string(self.cache_path(key)).ok()?;
        let entry: CacheEntry = serde_json::from_str(&content).ok()?;
        let data = BASE64.decode(entry.data).ok()?;

        Some(CachedData {
            data,
            cached_at: entry.cached_at,
            is_expired: Utc::now() >= entry.expires_at,
        })
    }

    /// Writes an entry, replacing whatever was there
    pub fn write(&self, key: &str, value: &[u8], ttl: std::time::Duration) -> Result<(), CacheError> {
        self.ensure_dir()?;
        let json = Self::encode_entry(key, value, ttl)?;
        Self::write_atomic(&self.cache_path(key), &json)
    }

    /// Deletes an entry; a missing entry is not an error
    pub fn remove(&self, key: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.cache_path(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.read(key).filter(|c| !c.is_expired).map(|c| c.data)
    }

    fn set_many(&self, entries: &[(String, Option<Vec<u8>>)], ttl: std::time::Duration) -> Result<(), CacheError> {
        for (key, value) in entries {
            match value {
                Some(value) => self.write(key, value, ttl)?,
                None => self.remove(key)?,
            }
        }
        Ok(())
    }

    fn add(&self, key: &str, value: &[u8], ttl: std::time::Duration) -> Result<bool, CacheError> {
        self.ensure_dir()?;
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.cache_dir.join(ADD_LOCK_FILE))?;
        // Held until `lock` drops; the OS releases it if the process dies
        lock.lock()?;

        if self.read(key).is_some_and(|existing| !existing.is_expired) {
            return Ok(false);
        }
        if let Err(e) = self.write(key, value, ttl) {
            warn!(key, error = %e, "failed to write cache marker");
            return Err(e);
        }
        Ok(true)
    }
}
