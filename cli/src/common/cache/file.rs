//! # DevDash File Cache
//!
//! File: cli/src/common/cache/file.rs
//!
//! ## Overview
//!
//! The fallback cache store: one JSON file per key under the configured cache
//! directory. A file's modification time is its TTL stamp, so an entry counts
//! as fresh while `now - mtime <= ttl`. Expired files are left in place and
//! simply overwritten by the next `set`.
//!
use crate::core::error::Result;
use anyhow::Context;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<first 32 hex chars of sha256(key)>.json`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{}.json", &digest[..32]))
    }

    /// Returns the stored value if it is younger than `ttl`.
    pub async fn get(&self, key: &str, ttl: Duration) -> Result<Option<String>> {
        let path = self.path_for(key);
        let meta = match fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            _ => return Ok(None),
        };
        let modified = meta
            .modified()
            .with_context(|| format!("No mtime for cache file {}", path.display()))?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age > ttl {
            debug!("File cache entry for '{}' expired ({}s old)", key, age.as_secs());
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read cache file {}", path.display()))?;
        Ok(Some(raw))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create cache dir {}", self.dir.display()))?;
        let path = self.path_for(key);
        fs::write(&path, value)
            .await
            .with_context(|| format!("Failed to write cache file {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_path_is_hashed_key() {
        let cache = FileCache::new("/tmp/c");
        let path = cache.path_for("projects:list:abc");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name.len(), 32 + ".json".len());
        assert!(name.ends_with(".json"));
        assert_ne!(path, cache.path_for("projects:list:abd"));
    }

    #[tokio::test]
    async fn test_set_then_get_within_ttl() -> Result<()> {
        let dir = tempdir()?;
        let cache = FileCache::new(dir.path().join("nested"));
        cache.set("k", "{\"a\":1}").await?;
        assert_eq!(
            cache.get("k", Duration::from_secs(10)).await?.as_deref(),
            Some("{\"a\":1}")
        );
        assert_eq!(cache.get("missing", Duration::from_secs(10)).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss() -> Result<()> {
        let dir = tempdir()?;
        let cache = FileCache::new(dir.path());
        cache.set("k", "v").await?;
        let old = SystemTime::now() - Duration::from_secs(60);
        std::fs::File::options()
            .write(true)
            .open(cache.path_for("k"))?
            .set_modified(old)?;
        assert_eq!(cache.get("k", Duration::from_secs(10)).await?, None);
        Ok(())
    }
}
