//! # DevDash Dashboard Services
//!
//! File: cli/src/dashboard/mod.rs
//!
//! ## Overview
//!
//! The operations behind the dashboard API, independent of HTTP. Each
//! submodule takes an `AppContext` (or the pieces of it it needs) and returns
//! `Result` values whose `DashError` kinds the server maps to status codes.
//! The CLI subcommands call the same functions.
//!
//! ## Architecture
//!
//! - `sandbox`: project name and relative path validation
//! - `listing`: bounded project file tree
//! - `files`: read, write, mkdir, rename and delete
//! - `metadata`: `.ftx_meta.json` and its cache mirror
//! - `registry`: project discovery and the list query
//! - `git`: git status snapshots
//! - `scaffold`: new project creation
//! - `health`: service, ping and store diagnostics
//! - `schema`: endpoint catalogue
//!
pub mod files;
pub mod git;
pub mod health;
pub mod listing;
pub mod metadata;
pub mod registry;
pub mod sandbox;
pub mod scaffold;
pub mod schema;
