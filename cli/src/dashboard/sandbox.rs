//! # DevDash Path Sandbox
//!
//! File: cli/src/dashboard/sandbox.rs
//!
//! ## Overview
//!
//! Every file operation addresses its target as *project name* plus *relative
//! path*. This module turns that pair into an absolute path that is
//! guaranteed to lie inside the project's canonical root, or fails.
//!
//! ## Rules
//!
//! - Project names must match `[A-Za-z0-9._-]+` and may not consist of dots
//!   only (400 "Invalid project"). A valid name without a directory is 404
//!   "Project not found".
//! - Relative paths containing `..` anywhere are rejected before any
//!   filesystem access (400 "Invalid path").
//! - `\` is normalized to `/` and leading slashes are dropped.
//! - Existing targets are canonicalized. Targets that do not exist yet keep
//!   the joined path, and their nearest existing ancestor is canonicalized
//!   instead, so a symlinked parent cannot redirect a creation.
//! - The result must start with the canonical project root (403 "Access denied").
//!
//! The check happens before the operation; a symlink swapped in between the
//! two is not detected.
//!
use crate::core::error::{DashError, Result};
use anyhow::{anyhow, Context};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// True for names matching `[A-Za-z0-9._-]+` that are not just dots.
pub fn is_valid_project_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        && !name.chars().all(|c| c == '.')
}

/// Resolves a project name to its canonical directory under `docroot`.
pub fn project_root(docroot: &Path, name: &str) -> Result<PathBuf> {
    let name = name.trim();
    if !is_valid_project_name(name) {
        return Err(DashError::invalid("Invalid project").into());
    }
    let dir = docroot.join(name);
    if !dir.is_dir() {
        return Err(DashError::not_found("Project not found").into());
    }
    fs::canonicalize(&dir).with_context(|| format!("Failed to resolve project dir {:?}", dir))
}

/// Cleans a user-supplied relative path. Fails on any `..`.
pub fn normalize_relative(rel: &str) -> Result<String> {
    let rel = rel.trim().replace('\\', "/");
    if rel.contains("..") {
        return Err(DashError::invalid("Invalid path").into());
    }
    Ok(rel.trim_start_matches('/').to_string())
}

/// Like `normalize_relative`, but an empty path is an error.
pub fn required_relative(rel: &str) -> Result<String> {
    let rel = normalize_relative(rel)?;
    if rel.is_empty() {
        return Err(DashError::invalid("Missing path").into());
    }
    Ok(rel)
}

/// Resolves `rel` inside the canonical `project_root`.
///
/// ## Arguments
///
/// * `project_root` - Canonical project directory (from `project_root`)
/// * `rel` - User-supplied relative path
///
/// ## Returns
///
/// * `Result<PathBuf>` - Absolute path inside the project root. May not exist.
pub fn resolve(project_root: &Path, rel: &str) -> Result<PathBuf> {
    let rel = normalize_relative(rel)?;
    let joined = if rel.is_empty() {
        project_root.to_path_buf()
    } else {
        project_root.join(&rel)
    };

    let resolved = match fs::canonicalize(&joined) {
        Ok(canonical) => canonical,
        Err(_) if joined.symlink_metadata().is_ok() => {
            warn!("Refusing dangling symlink {:?}", joined);
            return Err(access_denied());
        }
        Err(_) => {
            let anchor = nearest_existing_ancestor(&joined)
                .ok_or_else(access_denied)?;
            let anchor = fs::canonicalize(&anchor).map_err(|_| access_denied())?;
            if !anchor.starts_with(project_root) {
                warn!("Ancestor of {:?} resolves outside project: {:?}", joined, anchor);
                return Err(access_denied());
            }
            joined
        }
    };

    if !resolved.starts_with(project_root) {
        warn!("Path {:?} escapes project root {:?}", resolved, project_root);
        return Err(access_denied());
    }
    debug!("Resolved '{}' -> {:?}", rel, resolved);
    Ok(resolved)
}

fn nearest_existing_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .skip(1)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

fn access_denied() -> anyhow::Error {
    anyhow!(DashError::AccessDenied("Access denied".to_string()))
}
