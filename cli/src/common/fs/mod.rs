//! # DevDash Filesystem Utilities (`common::fs`)
//!
//! File: cli/src/common/fs/mod.rs
//!
//! ## Overview
//!
//! Organizational unit for filesystem helpers. Everything currently lives in
//! `io`; import from the submodule directly
//! (`use crate::common::fs::io::ensure_dir_exists;`).
//!

/// Basic file I/O operations (`ensure_dir_exists`, `copy_to_backup`, `looks_binary`, ...).
pub mod io;
