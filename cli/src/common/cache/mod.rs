//! # DevDash Cache Layer (`common::cache`)
//!
//! File: cli/src/common/cache/mod.rs
//!
//! ## Overview
//!
//! A small TTL cache for JSON values, used for the project list and the
//! project metadata mirror. Values go to a remote `KeyValueStore` (Redis) when
//! one is configured and to files otherwise.
//!
//! ## Architecture
//!
//! - `KeyValueStore`: the async seam for remote stores (`get`, `set_ex`, `ping`,
//!   `stats`). `remote::RedisStore` is the only implementation.
//! - `file::FileCache`: hashed JSON files whose mtime is the TTL stamp.
//! - `Cache`: combines both. Remote errors are logged and the file cache takes
//!   over for that call; reads also consult the file cache after a remote miss.
//!   Cache failures never fail a request.
//!
//! `Cache` is cheap to clone and lives in the `AppContext`.
//!
//! ## Examples
//!
//! ```rust
//! let cache = Cache::from_config(&cfg.cache)?;
//! if let Some(hit) = cache.get_json::<Listing>("projects:list:ab12", ttl).await {
//!     return Ok(hit);
//! }
//! cache.set_json("projects:list:ab12", &listing, ttl).await;
//! ```
//!
pub mod file;
pub mod remote;

use crate::core::config::CacheConfig;
use crate::core::error::Result;
use async_trait::async_trait;
use file::FileCache;
use remote::RedisStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Server-side statistics reported by the debug endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub db: i64,
    pub dbsize: i64,
    pub keys: Vec<String>,
    pub version: Option<String>,
    pub used_memory: Option<String>,
}

/// A remote key/value store with expiring entries.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    fn name(&self) -> &'static str;
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;
    /// Round-trip latency.
    async fn ping(&self) -> Result<Duration>;
    /// Database statistics plus up to `sample` keys matching `pattern`.
    async fn stats(&self, pattern: &str, sample: usize) -> Result<StoreStats>;
}

#[derive(Clone)]
pub struct Cache {
    remote: Option<Arc<dyn KeyValueStore>>,
    file: FileCache,
}

impl Cache {
    pub fn new(remote: Option<Arc<dyn KeyValueStore>>, file: FileCache) -> Self {
        Self { remote, file }
    }

    /// Builds the cache according to `cache.backend`.
    pub fn from_config(cfg: &CacheConfig) -> Result<Self> {
        let file = FileCache::new(&cfg.dir);
        let remote: Option<Arc<dyn KeyValueStore>> = if cfg.uses_redis() {
            info!(
                "Cache backend: redis at {}:{} (file fallback in {})",
                cfg.redis.effective_host(),
                cfg.redis.port,
                cfg.dir
            );
            Some(Arc::new(RedisStore::new(&cfg.redis)?))
        } else {
            info!("Cache backend: files in {}", cfg.dir);
            None
        };
        Ok(Self::new(remote, file))
    }

    pub fn remote(&self) -> Option<&Arc<dyn KeyValueStore>> {
        self.remote.as_ref()
    }

    pub fn backend_name(&self) -> &'static str {
        self.remote.as_ref().map(|r| r.name()).unwrap_or("file")
    }

    /// Looks a key up; any failure is treated as a miss.
    pub async fn get_raw(&self, key: &str, ttl: Duration) -> Option<String> {
        if let Some(remote) = &self.remote {
            match remote.get(key).await {
                Ok(Some(raw)) => {
                    debug!("Cache hit ({}) for '{}'", remote.name(), key);
                    return Some(raw);
                }
                Ok(None) => {}
                Err(e) => warn!("Cache get via {} failed for '{}': {:#}", remote.name(), key, e),
            }
        }
        match self.file.get(key, ttl).await {
            Ok(hit) => {
                if hit.is_some() {
                    debug!("Cache hit (file) for '{}'", key);
                }
                hit
            }
            Err(e) => {
                warn!("File cache read failed for '{}': {:#}", key, e);
                None
            }
        }
    }

    /// Stores a value; failures are logged, never returned.
    pub async fn set_raw(&self, key: &str, value: &str, ttl: Duration) {
        if let Some(remote) = &self.remote {
            match remote.set_ex(key, value, ttl.as_secs().max(1)).await {
                Ok(()) => return,
                Err(e) => warn!("Cache set via {} failed for '{}': {:#}", remote.name(), key, e),
            }
        }
        if let Err(e) = self.file.set(key, value).await {
            warn!("File cache write failed for '{}': {:#}", key, e);
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        let raw = self.get_raw(key, ttl).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding undecodable cache entry '{}': {}", key, e);
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set_raw(key, &raw, ttl).await,
            Err(e) => warn!("Cannot encode cache entry '{}': {}", key, e),
        }
    }
}
