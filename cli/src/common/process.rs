//! # DevDash Process Execution Utilities (`common::process`)
//!
//! File: cli/src/common/process.rs
//!
//! ## Overview
//!
//! This module wraps the execution of external programs (`git`, `composer`,
//! `npm`) behind the `CommandRunner` trait. Services receive the runner through
//! the `AppContext` instead of spawning processes themselves, which lets tests
//! substitute a scripted fake.
//!
//! ## Architecture
//!
//! - `CommandSpec`: program, arguments, working directory, extra environment,
//!   optional log file and timeout, built with chained setters.
//! - `CommandOutput`: exit code plus captured stdout/stderr. A non-zero exit is
//!   *not* an error at this level; callers decide what a failure means.
//! - `CommandRunner`: the async seam (`run` + `locate`).
//! - `SystemRunner`: the real implementation on `tokio::process`. Children are
//!   spawned with `kill_on_drop`, so a timeout or a cancelled token kills them.
//!
//! When a log file is set, stdout and stderr are appended to it instead of
//! being captured.
//!
//! ## Examples
//!
//! ```rust
//! let spec = CommandSpec::new("git")
//!     .args(["rev-parse", "--abbrev-ref", "HEAD"])
//!     .cwd(&project_dir)
//!     .timeout(Duration::from_secs(10));
//! let out = ctx.runner.run(&spec, &ctx.shutdown).await?;
//! if out.success() {
//!     println!("branch: {}", out.stdout.trim());
//! }
//! ```
//!
use crate::core::error::{DashError, Result};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Describes one external program invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub log_file: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn log_to(mut self, path: PathBuf) -> Self {
        self.log_file = Some(path);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Human-readable command line for logs and error messages.
    pub fn display(&self) -> String {
        let program = Path::new(&self.program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.clone());
        if self.args.is_empty() {
            program
        } else {
            format!("{} {}", program, self.args.join(" "))
        }
    }
}

/// Result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Trimmed stdout, or `None` when the command failed or printed nothing.
    pub fn text(&self) -> Option<String> {
        let out = self.stdout.trim();
        (self.success() && !out.is_empty()).then(|| out.to_string())
    }

    pub fn status_label(&self) -> String {
        match self.code {
            Some(code) => code.to_string(),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Executes external programs on behalf of the dashboard services.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `spec` to completion, honouring its timeout and `cancel`.
    async fn run(&self, spec: &CommandSpec, cancel: &CancellationToken) -> Result<CommandOutput>;

    /// Finds an executable on `PATH`.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Runs real processes with `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec, cancel: &CancellationToken) -> Result<CommandOutput> {
        let cmd_display = spec.display();
        debug!("Running: {}", cmd_display);

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        if let Some(log_path) = &spec.log_file {
            let log = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)
                .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
            let log_err = log
                .try_clone()
                .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
            cmd.stdout(Stdio::from(log)).stderr(Stdio::from(log_err));
        } else {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let child = cmd
            .spawn()
            .with_context(|| format!("Failed to start '{}'", cmd_display))?;
        let wait = child.wait_with_output();

        let output = match spec.timeout {
            Some(limit) => tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled(&cmd_display)),
                res = tokio::time::timeout(limit, wait) => match res {
                    Ok(out) => out,
                    Err(_) => {
                        warn!("'{}' timed out after {}s", cmd_display, limit.as_secs());
                        return Err(anyhow!(DashError::ExternalCommand {
                            cmd: cmd_display,
                            status: format!("timed out after {}s", limit.as_secs()),
                            log: log_label(spec),
                        }));
                    }
                },
            },
            None => tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled(&cmd_display)),
                out = wait => out,
            },
        }
        .with_context(|| format!("Failed to wait for '{}'", cmd_display))?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!("'{}' exited with {}", cmd_display, result.status_label());
        Ok(result)
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

fn cancelled(cmd_display: &str) -> anyhow::Error {
    warn!("'{}' cancelled by shutdown", cmd_display);
    anyhow!(DashError::Cancelled(cmd_display.to_string()))
}

fn log_label(spec: &CommandSpec) -> String {
    spec.log_file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not logged)".to_string())
}

/// Replaces everything outside `[A-Za-z0-9._-]` with `_`, for log file names.
pub fn sanitize_log_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}


// --- Unit Tests ---
#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_spec_display_uses_program_basename() {
        let spec = CommandSpec::new("/usr/bin/git").args(["status", "--porcelain=1"]);
        assert_eq!(spec.display(), "git status --porcelain=1");
    }

    #[test]
    fn test_sanitize_log_name() {
        assert_eq!(sanitize_log_name("symfony-create-my app"), "symfony-create-my_app");
        assert_eq!(sanitize_log_name("a/b:c"), "a_b_c");
    }

    #[test]
    fn test_output_text_requires_success() {
        let ok = CommandOutput { code: Some(0), stdout: " main\n".into(), stderr: String::new() };
        assert_eq!(ok.text().as_deref(), Some("main"));
        let failed = CommandOutput { code: Some(128), stdout: "main".into(), stderr: String::new() };
        assert_eq!(failed.text(), None);
    }

    #[tokio::test]
    async fn test_system_runner_captures_output() -> Result<()> {
        let dir = tempdir()?;
        let spec = CommandSpec::new("sh")
            .args(["-c", "printf \"$GREETING\"; pwd >&2; exit 3"])
            .env("GREETING", "hi")
            .cwd(dir.path());
        let out = SystemRunner.run(&spec, &CancellationToken::new()).await?;
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout, "hi");
        assert!(!out.stderr.trim().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_system_runner_appends_to_log() -> Result<()> {
        let dir = tempdir()?;
        let log = dir.path().join("step.log");
        fs::write(&log, "previous\n")?;
        let spec = CommandSpec::new("sh")
            .args(["-c", "echo out; echo err >&2"])
            .log_to(log.clone());
        let out = SystemRunner.run(&spec, &CancellationToken::new()).await?;
        assert!(out.success());
        assert!(out.stdout.is_empty());
        let content = fs::read_to_string(&log)?;
        assert!(content.starts_with("previous\n"));
        assert!(content.contains("out"));
        assert!(content.contains("err"));
        Ok(())
    }

    #[tokio::test]
    async fn test_system_runner_timeout() {
        let spec = CommandSpec::new("sleep")
            .arg("5")
            .timeout(Duration::from_millis(100));
        let err = SystemRunner
            .run(&spec, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DashError>(),
            Some(DashError::ExternalCommand { .. })
        ));
    }

    #[tokio::test]
    async fn test_system_runner_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let spec = CommandSpec::new("sleep").arg("5");
        let err = SystemRunner.run(&spec, &token).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DashError>(),
            Some(DashError::Cancelled(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let spec = CommandSpec::new("devdash-no-such-program-xyz");
        assert!(SystemRunner.run(&spec, &CancellationToken::new()).await.is_err());
    }
}
