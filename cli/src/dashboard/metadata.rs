//! # DevDash Project Metadata
//!
//! File: cli/src/dashboard/metadata.rs
//!
//! ## Overview
//!
//! Each project can carry a `.ftx_meta.json` file with four optional keys:
//! `createdAt` (unix seconds), `entry`, `type` and `notes`. The file is the
//! source of truth; a copy is mirrored into the cache under
//! `ftx:project:<name>` so other tools can read it without touching the disk.
//!
//! Loading is tolerant: a missing or unreadable file is an empty record,
//! unknown keys are dropped, and a numeric string is accepted for
//! `createdAt`. Saving writes only the four known keys.
//!
use crate::common::cache::Cache;
use crate::common::fs::io;
use crate::core::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const META_FILENAME: &str = ".ftx_meta.json";

/// Key prefix shared by everything devdash stores in Redis.
pub const KEY_PREFIX: &str = "ftx:";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectMeta {
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none", default)]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub entry: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
}

impl ProjectMeta {
    /// Picks the known keys out of an arbitrary JSON object.
    pub fn from_json(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let created_at = value.get("createdAt").and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
                .filter(|&t| t > 0)
        });
        Self {
            created_at,
            entry: text("entry"),
            kind: text("type"),
            notes: text("notes"),
        }
    }

    /// Fills unset `entry`/`type` from detection results.
    pub fn with_detected(mut self, entry: Option<&str>, kind: &str) -> Self {
        if self.entry.is_none() {
            self.entry = entry.map(str::to_string);
        }
        if self.kind.is_none() && !kind.is_empty() {
            self.kind = Some(kind.to_string());
        }
        self
    }
}

pub fn meta_path(project_dir: &Path) -> PathBuf {
    project_dir.join(META_FILENAME)
}

/// Loads the metadata file; problems degrade to an empty record.
pub fn load(project_dir: &Path) -> ProjectMeta {
    let path = meta_path(project_dir);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(_) => return ProjectMeta::default(),
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(value) => ProjectMeta::from_json(&value),
        Err(e) => {
            warn!("Ignoring malformed {:?}: {}", path, e);
            ProjectMeta::default()
        }
    }
}

/// Writes the metadata file (pretty-printed).
pub fn save(project_dir: &Path, meta: &ProjectMeta) -> Result<()> {
    let json = serde_json::to_string_pretty(meta)?;
    io::write_string_to_file(&meta_path(project_dir), &json)?;
    debug!("Saved metadata for {:?}", project_dir);
    Ok(())
}

pub fn mirror_key(name: &str) -> String {
    format!("{}project:{}", KEY_PREFIX, name)
}

pub async fn mirror_get(cache: &Cache, name: &str, ttl: Duration) -> ProjectMeta {
    cache
        .get_json::<ProjectMeta>(&mirror_key(name), ttl)
        .await
        .unwrap_or_default()
}

pub async fn mirror_set(cache: &Cache, name: &str, meta: &ProjectMeta, ttl: Duration) {
    if *meta == ProjectMeta::default() {
        return;
    }
    cache.set_json(&mirror_key(name), meta, ttl).await;
}
