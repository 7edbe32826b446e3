//! # DevDash CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared helpers for the integration tests in `cli/tests/`. Each test file
//! declares `mod common;` and runs the compiled `devdash` binary against a
//! throwaway document root.
//!

#![allow(dead_code)]

pub use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// # Get DevDash Command (`devdash_cmd`)
///
/// An `assert_cmd::Command` for the compiled `devdash` binary, isolated from
/// the user's configuration and any Redis settings in the environment.
///
/// ## Panics
/// Panics if the `devdash` binary cannot be found via `Command::cargo_bin`.
pub fn devdash_cmd(config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("devdash").expect("Failed to find devdash binary for testing");
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env_remove("DEVDASH_ROOT")
        .env_remove("REDIS_HOST")
        .env_remove("REDIS_CONTAINER")
        .env_remove("RUST_LOG");
    cmd
}

/// A document root with two projects plus a directory for cache and config.
pub struct Workspace {
    pub root: TempDir,
    pub home: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp document root");
        let home = TempDir::new().expect("Failed to create temp config home");

        fs::create_dir_all(root.path().join("blog")).unwrap();
        fs::write(root.path().join("blog/index.php"), "<?php echo 'hi';").unwrap();
        fs::create_dir_all(root.path().join("shop/public")).unwrap();
        fs::write(root.path().join("shop/public/index.php"), "<?php").unwrap();
        fs::create_dir_all(root.path().join("_dashboard")).unwrap();

        let cache = home.path().join("cache");
        fs::write(
            root.path().join(".devdash.toml"),
            format!(
                "[cache]\nbackend = \"file\"\ndir = {:?}\n\n[scaffold]\nlog_dir = {:?}\n",
                cache.display().to_string(),
                cache.join("logs").display().to_string()
            ),
        )
        .unwrap();

        Self { root, home }
    }

    /// `devdash <args> --root <workspace root>`.
    pub fn cmd(&self, args: &[&str]) -> Command {
        let mut cmd = devdash_cmd(self.home.path());
        cmd.args(args).arg("--root").arg(self.root.path());
        cmd
    }
}
