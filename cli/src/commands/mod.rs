//! # DevDash Command Modules
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! The top-level commands of the DevDash CLI. `serve` runs the dashboard
//! backend; the others call the same dashboard services from the terminal.
//!
//! ## Command Groups
//!
//! - `serve`: HTTP API and dashboard frontend
//! - `projects`: list the projects in a document root
//! - `git`: git status of one or all projects
//! - `create`: scaffold a new project
//!
use crate::core::config;
use crate::core::context::AppContext;
use crate::core::error::Result;
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;

/// Command for scaffolding a new project.
pub mod create;
/// Command for reporting git status.
pub mod git;
/// Command for listing projects.
pub mod projects;
/// Command for the dashboard HTTP server.
pub mod serve;

/// Document root selection shared by the non-server commands.
#[derive(Args, Debug, Clone)]
pub struct RootArgs {
    /// Document root holding the project directories.
    #[arg(long, env = "DEVDASH_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Extra TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl RootArgs {
    /// Loads the configuration for the root and builds the service context.
    pub fn context(&self) -> Result<AppContext> {
        let cfg = config::load_config(&self.root, self.config.as_deref())
            .context("Failed to load devdash configuration")?;
        AppContext::new(cfg)
    }
}
