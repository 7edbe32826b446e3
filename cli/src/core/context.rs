//! # DevDash Application Context
//!
//! File: cli/src/core/context.rs
//!
//! ## Overview
//!
//! `AppContext` bundles the handles every dashboard service needs: the loaded
//! configuration, the cache, the process runner and the shutdown token. It is
//! created once per command invocation and passed explicitly (the HTTP server
//! stores it as axum state), so there is no global connection or config.
//!
//! Cloning is cheap; all members are reference-counted.
//!
use crate::common::cache::Cache;
use crate::common::process::{CommandRunner, SystemRunner};
use crate::core::config::DashboardConfig;
use crate::core::error::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<DashboardConfig>,
    pub cache: Cache,
    pub runner: Arc<dyn CommandRunner>,
    /// Cancelled on server shutdown; external processes observe it.
    pub shutdown: CancellationToken,
}

impl AppContext {
    /// Builds a context with the real process runner and the configured cache.
    pub fn new(config: DashboardConfig) -> Result<Self> {
        let cache = Cache::from_config(&config.cache)?;
        Ok(Self {
            config: Arc::new(config),
            cache,
            runner: Arc::new(SystemRunner),
            shutdown: CancellationToken::new(),
        })
    }

    /// Replaces the process runner (tests use scripted fakes).
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.config.process.git_timeout_secs)
    }

    pub fn scaffold_timeout(&self) -> Duration {
        Duration::from_secs(self.config.process.scaffold_timeout_secs)
    }
}
