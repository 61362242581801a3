//! Side cache for file listings, share links and file metadata.
//!
//! The cache is optional: every consumer holds an `Option<Arc<dyn Cache>>`
//! and falls back to the database when it is absent or failing. Keys:
//! - `user_files:{owner_id}`: JSON array of file records
//! - `shared_file:{file_id}`: public URL string (fixed TTL)
//! - `file_metadata:{file_id}`: JSON file record

mod memory;
mod redis_cache;

pub use self::memory::MemoryCache;
pub use self::redis_cache::RedisCache;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{CacheBackend, CacheConfig};
use crate::file::FileRecord;
use crate::Result;

/// String key/value store with optional per-entry TTL.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a value; `None` on miss or expiry.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value. `ttl = None` keeps it until deleted.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Drop expired entries, returning how many were removed. Backends that
    /// expire keys on their own have nothing to do.
    async fn purge_expired(&self) -> Result<usize> {
        Ok(0)
    }
}

/// Build the configured cache backend.
pub async fn from_config(config: &CacheConfig) -> Result<Option<Arc<dyn Cache>>> {
    match config.backend {
        CacheBackend::None => Ok(None),
        CacheBackend::Memory => Ok(Some(Arc::new(MemoryCache::new()))),
        CacheBackend::Redis => {
            let url = config.redis_url.as_deref().unwrap_or_default();
            let cache = RedisCache::connect(url, config.redis_password.as_deref()).await?;
            Ok(Some(Arc::new(cache)))
        }
    }
}

/// Cache key for an owner's file listing.
pub fn user_files_key(owner_id: i64) -> String {
    format!("user_files:{owner_id}")
}

/// Cache key for a file's share URL.
pub fn shared_file_key(file_id: i64) -> String {
    format!("shared_file:{file_id}")
}

/// Cache key for a file's metadata.
pub fn file_metadata_key(file_id: i64) -> String {
    format!("file_metadata:{file_id}")
}

/// File-domain view over an optional [`Cache`].
///
/// All operations are best effort: backend errors are logged and reported
/// as a miss (reads) or ignored (writes), so a failing cache never fails a
/// request.
#[derive(Clone)]
pub struct FileCache {
    inner: Option<Arc<dyn Cache>>,
    share_ttl: Duration,
    listing_ttl: Option<Duration>,
}

impl FileCache {
    pub fn new(inner: Option<Arc<dyn Cache>>, share_ttl: Duration) -> Self {
        Self {
            inner,
            share_ttl,
            listing_ttl: None,
        }
    }

    /// Build from configuration and an already constructed backend.
    pub fn from_config(inner: Option<Arc<dyn Cache>>, config: &CacheConfig) -> Self {
        Self::new(inner, Duration::from_secs(config.share_ttl_secs))
            .with_listing_ttl(config.listing_ttl_secs.map(Duration::from_secs))
    }

    /// Cache disabled.
    pub fn disabled() -> Self {
        Self::new(None, Duration::from_secs(3600))
    }

    /// Expire listings after `ttl` in addition to explicit invalidation.
    pub fn with_listing_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.listing_ttl = ttl;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn share_ttl(&self) -> Duration {
        self.share_ttl
    }

    /// Cached listing JSON for an owner, returned verbatim.
    pub async fn listing(&self, owner_id: i64) -> Option<String> {
        self.get(&user_files_key(owner_id)).await
    }

    pub async fn store_listing(&self, owner_id: i64, files: &[FileRecord]) {
        match serde_json::to_string(files) {
            Ok(json) => {
                self.set(&user_files_key(owner_id), &json, self.listing_ttl)
                    .await
            }
            Err(e) => warn!(owner_id, error = %e, "Failed to serialize listing for cache"),
        }
    }

    pub async fn invalidate_listing(&self, owner_id: i64) {
        self.delete(&user_files_key(owner_id)).await;
    }

    pub async fn share_url(&self, file_id: i64) -> Option<String> {
        self.get(&shared_file_key(file_id)).await
    }

    pub async fn store_share_url(&self, file_id: i64, url: &str) {
        self.set(&shared_file_key(file_id), url, Some(self.share_ttl))
            .await;
    }

    pub async fn store_metadata(&self, file: &FileRecord) {
        match serde_json::to_string(file) {
            Ok(json) => self.set(&file_metadata_key(file.id), &json, None).await,
            Err(e) => warn!(file_id = file.id, error = %e, "Failed to serialize metadata for cache"),
        }
    }

    pub async fn metadata(&self, file_id: i64) -> Option<FileRecord> {
        let json = self.get(&file_metadata_key(file_id)).await?;
        match serde_json::from_str(&json) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(file_id, error = %e, "Discarding unreadable cached metadata");
                None
            }
        }
    }

    /// Drop every key derived from a file that no longer exists.
    pub async fn evict_file(&self, file: &FileRecord) {
        self.delete(&user_files_key(file.owner_id)).await;
        self.delete(&shared_file_key(file.id)).await;
        self.delete(&file_metadata_key(file.id)).await;
    }

    /// Drop expired entries from the backend.
    pub async fn purge_expired(&self) -> usize {
        let Some(cache) = &self.inner else {
            return 0;
        };
        match cache.purge_expired().await {
            Ok(purged) => purged,
            Err(e) => {
                warn!(error = %e, "Cache purge failed");
                0
            }
        }
    }

    async fn get(&self, key: &str) -> Option<String> {
        let cache = self.inner.as_ref()?;
        match cache.get(key).await {
            Ok(hit) => {
                debug!(key, hit = hit.is_some(), "Cache lookup");
                hit
            }
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, falling back to database");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        if let Some(cache) = &self.inner {
            if let Err(e) = cache.set(key, value, ttl).await {
                warn!(key, error = %e, "Cache write failed");
            }
        }
    }

    async fn delete(&self, key: &str) {
        if let Some(cache) = &self.inner {
            if let Err(e) = cache.delete(key).await {
                warn!(key, error = %e, "Cache delete failed");
            }
        }
    }
}

impl std::fmt::Debug for FileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCache")
            .field("enabled", &self.is_enabled())
            .field("share_ttl", &self.share_ttl)
            .field("listing_ttl", &self.listing_ttl)
            .finish()
    }
}
