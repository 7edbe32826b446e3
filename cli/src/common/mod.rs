//! # DevDash Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! ## Overview
//!
//! This module is the entry point for the shared utility modules used by the
//! dashboard services and the command handlers. It keeps cross-cutting
//! concerns (caching, filesystem helpers, networking probes, process
//! execution, string ordering) apart from command-specific logic
//! (`commands::`) and core infrastructure (`core::`).
//!
//! ## Architecture
//!
//! - **`cache`**: TTL cache for JSON values, Redis-backed with a file fallback.
//! - **`fs`**: Filesystem helpers (`ensure_dir_exists`, `.bak` copies, binary heuristic).
//! - **`network`**: TCP and HTTP reachability probes.
//! - **`process`**: The `CommandRunner` seam for `git`, `composer` and `npm`.
//! - **`text`**: Natural case-insensitive ordering and substring matching.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::{fs::io, process::CommandSpec, text};
//!
//! io::ensure_dir_exists(&log_dir)?;
//! names.sort_by(|a, b| text::natural_cmp(a, b));
//! ```
//!

/// Redis-or-file TTL cache.
pub mod cache;
/// Filesystem helpers.
pub mod fs;
/// TCP/HTTP reachability probes.
pub mod network;
/// External process execution with timeouts and cancellation.
pub mod process;
/// String ordering and matching.
pub mod text;
