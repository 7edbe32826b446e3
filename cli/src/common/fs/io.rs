//! # DevDash Filesystem I/O Operations
//!
//! File: cli/src/common/fs/io.rs
//!
//! ## Overview
//!
//! This module centralizes the small filesystem helpers shared by the file
//! editor, the project registry and the scaffolder: ensuring directories
//! exist, writing text files, `.bak` backups, modification times as unix
//! seconds and the binary-content heuristic.
//!
//! ## Architecture
//!
//! - **`ensure_dir_exists`**: `mkdir -p`, failing if the path is a file.
//! - **`write_string_to_file`**: Creates the parent directory, then overwrites the file.
//! - **`backup_path` / `copy_to_backup`**: `<file>.bak` next to the original.
//! - **`mtime_secs`**: Modification time of a `Metadata` as unix seconds (0 if unknown).
//! - **`looks_binary`**: NUL byte, or more than 30% of bytes outside
//!   TAB/LF/CR/printable ASCII.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::fs::io;
//!
//! io::ensure_dir_exists(&log_dir)?;
//! if target.is_file() {
//!     io::copy_to_backup(&target)?;
//! }
//! io::write_string_to_file(&target, content)?;
//! ```
//!
use crate::core::error::{DashError, Result};
use anyhow::Context;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info};

/// Share of non-text bytes above which content counts as binary.
const BINARY_RATIO: f64 = 0.30;

/// Ensures that a directory exists at the specified path.
///
/// # Arguments
///
/// * `path` - The directory to create if missing, including parents.
///
/// # Errors
///
/// Returns an `Err` if the path exists but is not a directory, or if creating
/// it fails.
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {:?}", path))?;
        info!("Created directory: {:?}", path);
    } else if !path.is_dir() {
        anyhow::bail!(DashError::FileSystem(format!(
            "Path exists but is not a directory: {:?}",
            path
        )));
    } else {
        debug!("Directory already exists: {:?}", path);
    }
    Ok(())
}

/// Writes string content to a file, creating its parent directory first.
pub fn write_string_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir_exists(parent)?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write to file {:?}", path))?;
    debug!("Wrote {} bytes to {:?}", content.len(), path);
    Ok(())
}

/// `notes.txt` -> `notes.txt.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Copies `path` to its `.bak` sibling, replacing an older backup.
pub fn copy_to_backup(path: &Path) -> Result<PathBuf> {
    let backup = backup_path(path);
    fs::copy(path, &backup)
        .with_context(|| format!("Failed to copy {:?} to {:?}", path, backup))?;
    debug!("Backup written: {:?}", backup);
    Ok(backup)
}

/// Modification time as unix seconds; 0 when the platform cannot tell.
pub fn mtime_secs(meta: &fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Heuristic used by the editor to refuse showing binary files.
pub fn looks_binary(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    if bytes.contains(&0) {
        return true;
    }
    let non_text = bytes
        .iter()
        .filter(|&&b| !matches!(b, b'\t' | b'\n' | b'\r' | 0x20..=0x7E))
        .count();
    (non_text as f64 / bytes.len() as f64) > BINARY_RATIO
}
