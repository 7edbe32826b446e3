//! # DevDash File Content Service
//!
//! File: cli/src/dashboard/files.rs
//!
//! ## Overview
//!
//! Read, write, rename, delete and create-directory operations on single
//! entries inside a project. Every path goes through `sandbox::resolve`
//! first; the functions here only add the per-operation rules.
//!
//! | Operation | Failure modes |
//! |-----------|---------------|
//! | `read`    | 404 "Not a file", 413 "File too large (>2MB)" |
//! | `write`   | 400 "Missing content", 415 denied extension, 500 "Cannot create directory" / "Write failed" |
//! | `rename`  | 404 "Source not found", 409 "Target exists", 500 "Rename failed" |
//! | `delete`  | 404 "Not found", 500 "Trash copy failed", 400 "Delete failed (not empty?)" |
//!
//! Writes keep a best-effort `.bak` copy of the previous content. Concurrent
//! mutations of the same path are not coordinated; the last writer wins.
//!
use crate::common::fs::io;
use crate::core::config::DashboardConfig;
use crate::core::error::{DashError, Result};
use crate::dashboard::sandbox;
use anyhow::anyhow;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FileRead {
    pub project: String,
    pub path: String,
    pub binary: bool,
    pub content: Option<String>,
    #[serde(skip)]
    pub size: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FileWritten {
    pub project: String,
    pub path: String,
    pub written: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DirCreated {
    pub project: String,
    pub path: String,
    pub created: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    pub renamed: bool,
    pub old: String,
    pub new: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Deleted {
    pub deleted: bool,
    pub path: String,
    pub trashed: bool,
}

fn fail(err: DashError) -> anyhow::Error {
    anyhow!(err)
}

fn server_error(msg: &str) -> anyhow::Error {
    anyhow!(DashError::FileSystem(msg.to_string()))
}

/// Reads a text file, or reports it as binary.
pub fn read(cfg: &DashboardConfig, project: &str, rel: &str) -> Result<FileRead> {
    let project_dir = sandbox::project_root(&cfg.root, project)?;
    let rel = sandbox::required_relative(rel)?;
    let abs = sandbox::resolve(&project_dir, &rel)?;

    let meta = fs::metadata(&abs).ok().filter(|m| m.is_file());
    let Some(meta) = meta else {
        return Err(fail(DashError::not_found("Not a file")));
    };
    if meta.len() > cfg.files.max_read_bytes {
        return Err(fail(DashError::PayloadTooLarge(format!(
            "File too large (>{})",
            human_limit(cfg.files.max_read_bytes)
        ))));
    }

    let raw = fs::read(&abs).map_err(|e| {
        warn!("Read of {:?} failed: {}", abs, e);
        server_error("Read failed")
    })?;
    let size = raw.len() as u64;
    let binary = io::looks_binary(&raw);
    let content = if binary {
        None
    } else {
        Some(String::from_utf8_lossy(&raw).into_owned())
    };
    debug!("Read {:?} ({} bytes, binary={})", abs, size, binary);
    Ok(FileRead {
        project: project.trim().to_string(),
        path: rel,
        binary,
        content,
        size,
    })
}

/// `2_000_000` -> `2MB`
fn human_limit(bytes: u64) -> String {
    if bytes >= 1_000_000 && bytes % 1_000_000 == 0 {
        format!("{}MB", bytes / 1_000_000)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Lowercased extension of the final path component, if any.
fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

/// Writes `content`, creating parent directories and a `.bak` of the old file.
pub fn write(
    cfg: &DashboardConfig,
    project: &str,
    rel: &str,
    content: Option<&str>,
) -> Result<FileWritten> {
    let project_dir = sandbox::project_root(&cfg.root, project)?;
    let rel = sandbox::required_relative(rel)?;
    let Some(content) = content else {
        return Err(fail(DashError::invalid("Missing content")));
    };
    let abs = sandbox::resolve(&project_dir, &rel)?;

    if let Some(ext) = extension_of(&abs) {
        if cfg.files.deny_extensions.iter().any(|d| d.eq_ignore_ascii_case(&ext)) {
            return Err(fail(DashError::UnsupportedMedia(
                "Binary/unsafe file type denied".to_string(),
            )));
        }
    }

    if let Some(parent) = abs.parent() {
        if !parent.is_dir() {
            fs::create_dir_all(parent).map_err(|e| {
                warn!("mkdir {:?} failed: {}", parent, e);
                server_error("Cannot create directory")
            })?;
        }
    }

    if abs.is_file() {
        if let Err(e) = io::copy_to_backup(&abs) {
            warn!("Backup before write failed (continuing): {:#}", e);
        }
    }

    fs::write(&abs, content).map_err(|e| {
        warn!("Write to {:?} failed: {}", abs, e);
        server_error("Write failed")
    })?;
    info!("Wrote {} bytes to {}/{}", content.len(), project.trim(), rel);
    Ok(FileWritten {
        project: project.trim().to_string(),
        path: rel,
        written: content.len(),
    })
}

/// Creates a directory (and missing parents) at `rel`.
pub fn make_dir(cfg: &DashboardConfig, project: &str, rel: &str) -> Result<DirCreated> {
    let project_dir = sandbox::project_root(&cfg.root, project)?;
    let rel = sandbox::required_relative(rel)?;
    let abs = sandbox::resolve(&project_dir, &rel)?;
    if abs.is_file() {
        return Err(fail(DashError::Conflict("Target exists".to_string())));
    }
    let created = !abs.is_dir();
    fs::create_dir_all(&abs).map_err(|e| {
        warn!("mkdir {:?} failed: {}", abs, e);
        server_error("Cannot create directory")
    })?;
    info!("Created directory {}/{}", project.trim(), rel);
    Ok(DirCreated {
        project: project.trim().to_string(),
        path: rel,
        created,
    })
}

/// Renames an entry; never overwrites.
pub fn rename(cfg: &DashboardConfig, project: &str, old_rel: &str, new_rel: &str) -> Result<Renamed> {
    let project_dir = sandbox::project_root(&cfg.root, project)?;
    let old_rel = sandbox::required_relative(old_rel)?;
    let new_rel = sandbox::required_relative(new_rel)?;
    let old = sandbox::resolve(&project_dir, &old_rel)?;
    let new = sandbox::resolve(&project_dir, &new_rel)?;

    if old.symlink_metadata().is_err() {
        return Err(fail(DashError::not_found("Source not found")));
    }
    if new.symlink_metadata().is_ok() {
        return Err(fail(DashError::Conflict("Target exists".to_string())));
    }
    fs::rename(&old, &new).map_err(|e| {
        warn!("Rename {:?} -> {:?} failed: {}", old, new, e);
        server_error("Rename failed")
    })?;
    info!("Renamed {}/{} -> {}", project.trim(), old_rel, new_rel);
    Ok(Renamed {
        renamed: true,
        old: old_rel,
        new: new_rel,
    })
}

/// Deletes a file or an empty directory. With `trash`, files are first
/// copied to `<path>.bak`.
pub fn delete(cfg: &DashboardConfig, project: &str, rel: &str, trash: bool) -> Result<Deleted> {
    let project_dir = sandbox::project_root(&cfg.root, project)?;
    let rel = sandbox::required_relative(rel)?;
    let abs = sandbox::resolve(&project_dir, &rel)?;

    let Ok(meta) = fs::metadata(&abs) else {
        return Err(fail(DashError::not_found("Not found")));
    };
    if trash && meta.is_file() {
        io::copy_to_backup(&abs).map_err(|e| {
            warn!("Trash copy of {:?} failed: {:#}", abs, e);
            server_error("Trash copy failed")
        })?;
    }

    let removed = if meta.is_dir() {
        fs::remove_dir(&abs)
    } else {
        fs::remove_file(&abs)
    };
    removed.map_err(|e| {
        warn!("Delete of {:?} failed: {}", abs, e);
        fail(DashError::invalid("Delete failed (not empty?)"))
    })?;
    info!("Deleted {}/{} (trash={})", project.trim(), rel, trash);
    Ok(Deleted {
        deleted: true,
        path: rel,
        trashed: trash,
    })
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, DashboardConfig) {
        let docroot = tempdir().unwrap();
        fs::create_dir(docroot.path().join("demo")).unwrap();
        let root = fs::canonicalize(docroot.path()).unwrap();
        (docroot, DashboardConfig::for_root(&root))
    }

    fn status_of(err: &anyhow::Error) -> StatusCode {
        err.downcast_ref::<DashError>().map(DashError::status).unwrap()
    }

    #[test]
    fn test_write_then_read_round_trip() -> Result<()> {
        let (_d, cfg) = setup();
        let written = write(&cfg, "demo", "notes.txt", Some("hello"))?;
        assert_eq!(written.written, 5);
        let read_back = read(&cfg, "demo", "notes.txt")?;
        assert_eq!(read_back.content.as_deref(), Some("hello"));
        assert!(!read_back.binary);
        assert_eq!(read_back.size, 5);
        Ok(())
    }

    #[test]
    fn test_write_creates_parents_and_backup() -> Result<()> {
        let (_d, cfg) = setup();
        write(&cfg, "demo", "src/deep/app.js", Some("v1"))?;
        write(&cfg, "demo", "src/deep/app.js", Some("v2"))?;
        let dir = cfg.root.join("demo/src/deep");
        assert_eq!(fs::read_to_string(dir.join("app.js"))?, "v2");
        assert_eq!(fs::read_to_string(dir.join("app.js.bak"))?, "v1");
        Ok(())
    }

    #[test]
    fn test_write_rejections() {
        let (_d, cfg) = setup();
        let err = write(&cfg, "demo", "x.txt", None).unwrap_err();
        assert_eq!(err.to_string(), "Missing content");
        let err = write(&cfg, "demo", "img/logo.PNG", Some("x")).unwrap_err();
        assert_eq!(status_of(&err), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(!cfg.root.join("demo/img").exists());
        let err = write(&cfg, "demo", "../escape.txt", Some("x")).unwrap_err();
        assert_eq!(status_of(&err), StatusCode::BAD_REQUEST);
        let err = write(&cfg, "nope", "a.txt", Some("x")).unwrap_err();
        assert_eq!(status_of(&err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_read_binary_and_limits() -> Result<()> {
        let (_d, mut cfg) = setup();
        fs::write(cfg.root.join("demo/blob.bin"), [0u8, 1, 2, 3])?;
        let res = read(&cfg, "demo", "blob.bin")?;
        assert!(res.binary);
        assert_eq!(res.content, None);

        let err = read(&cfg, "demo", "missing.txt").unwrap_err();
        assert_eq!(err.to_string(), "Not a file");
        fs::create_dir(cfg.root.join("demo/sub"))?;
        assert_eq!(status_of(&read(&cfg, "demo", "sub").unwrap_err()), StatusCode::NOT_FOUND);

        cfg.files.max_read_bytes = 3;
        let err = read(&cfg, "demo", "blob.bin").unwrap_err();
        assert_eq!(status_of(&err), StatusCode::PAYLOAD_TOO_LARGE);
        Ok(())
    }

    #[test]
    fn test_too_large_message() {
        assert_eq!(human_limit(2_000_000), "2MB");
        assert_eq!(human_limit(1500), "1500 bytes");
    }

    #[test]
    fn test_rename_onto_existing_is_conflict_and_keeps_both() -> Result<()> {
        let (_d, cfg) = setup();
        write(&cfg, "demo", "a.txt", Some("A"))?;
        write(&cfg, "demo", "b.txt", Some("B"))?;
        let err = rename(&cfg, "demo", "a.txt", "b.txt").unwrap_err();
        assert_eq!(status_of(&err), StatusCode::CONFLICT);
        assert_eq!(fs::read_to_string(cfg.root.join("demo/a.txt"))?, "A");
        assert_eq!(fs::read_to_string(cfg.root.join("demo/b.txt"))?, "B");

        let err = rename(&cfg, "demo", "ghost.txt", "c.txt").unwrap_err();
        assert_eq!(err.to_string(), "Source not found");

        let ok = rename(&cfg, "demo", "a.txt", "c.txt")?;
        assert!(ok.renamed);
        assert!(cfg.root.join("demo/c.txt").is_file());
        assert!(!cfg.root.join("demo/a.txt").exists());
        Ok(())
    }

    #[test]
    fn test_delete_rules() -> Result<()> {
        let (_d, cfg) = setup();
        let err = delete(&cfg, "demo", "ghost.txt", false).unwrap_err();
        assert_eq!(status_of(&err), StatusCode::NOT_FOUND);

        write(&cfg, "demo", "dir/keep.txt", Some("k"))?;
        let err = delete(&cfg, "demo", "dir", false).unwrap_err();
        assert_eq!(err.to_string(), "Delete failed (not empty?)");

        let res = delete(&cfg, "demo", "dir/keep.txt", true)?;
        assert!(res.trashed);
        assert!(!cfg.root.join("demo/dir/keep.txt").exists());
        assert_eq!(fs::read_to_string(cfg.root.join("demo/dir/keep.txt.bak"))?, "k");
        Ok(())
    }

    #[test]
    fn test_make_dir() -> Result<()> {
        let (_d, cfg) = setup();
        let res = make_dir(&cfg, "demo", "assets/css")?;
        assert!(res.created);
        assert!(cfg.root.join("demo/assets/css").is_dir());
        assert!(!make_dir(&cfg, "demo", "assets/css")?.created);
        Ok(())
    }
}
