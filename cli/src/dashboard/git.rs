//! # DevDash Git Status Reporter
//!
//! File: cli/src/dashboard/git.rs
//!
//! ## Overview
//!
//! Produces a `GitStatus` snapshot for a project directory: branch, short
//! commit, `describe`, last commit, working tree changes, first fetch remote
//! and ahead/behind counts against the upstream.
//!
//! ## Architecture
//!
//! - Without a `.git` entry the default snapshot is returned and no process
//!   is started.
//! - With a `git` binary (found through the runner's `locate`) every field is
//!   filled by its own read-only command. Each command is advisory: failure,
//!   timeout or empty output leaves that one field at its default.
//! - `quick` skips `describe`, `log`, `status` and `remote`. Divergence is
//!   always attempted, except on a detached `HEAD`.
//! - Without a binary, or outside a work tree, `.git/HEAD` is parsed directly
//!   (loose ref file first, then `packed-refs`).
//!
//! All commands share the configured git timeout and the context's shutdown
//! token.
//!
use crate::common::process::{CommandOutput, CommandRunner, CommandSpec};
use crate::core::context::AppContext;
use crate::core::error::{DashError, Result};
use crate::dashboard::{registry, sandbox};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Projects probed in parallel by `status_all`.
const PARALLEL_PROBES: usize = 4;

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct GitStatus {
    pub is_git: bool,
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub describe: Option<String>,
    pub last_commit: Option<LastCommit>,
    pub dirty: bool,
    pub changes: Changes,
    pub remote: Option<String>,
    pub divergence: Option<Divergence>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LastCommit {
    pub hash: String,
    pub time: i64,
    pub author: String,
    pub subject: String,
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changes {
    pub modified: usize,
    pub untracked: usize,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divergence {
    pub ahead: u64,
    pub behind: u64,
}

/// One row of the all-projects report.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GitStatusItem {
    pub project: String,
    #[serde(flatten)]
    pub status: GitStatus,
}

/// Runs git commands in one directory.
struct GitProbe<'a> {
    runner: &'a dyn CommandRunner,
    git: PathBuf,
    dir: &'a Path,
    timeout: Duration,
    cancel: &'a CancellationToken,
}

impl GitProbe<'_> {
    async fn output(&self, args: &[&str]) -> Option<CommandOutput> {
        let spec = CommandSpec::new(self.git.to_string_lossy())
            .args(args.iter().copied())
            .cwd(self.dir)
            .timeout(self.timeout);
        match self.runner.run(&spec, self.cancel).await {
            Ok(out) => Some(out),
            Err(e) => {
                debug!("git {} in {:?} failed: {:#}", args.join(" "), self.dir, e);
                None
            }
        }
    }

    async fn text(&self, args: &[&str]) -> Option<String> {
        self.output(args).await.and_then(|o| o.text())
    }

    async fn succeeds(&self, args: &[&str]) -> bool {
        self.output(args).await.is_some_and(|o| o.success())
    }

    async fn divergence(&self, branch: &str) -> Option<Divergence> {
        if branch.is_empty() || branch == "HEAD" {
            return None;
        }
        let upstream = match self
            .text(&["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"])
            .await
        {
            Some(u) => u,
            None => {
                let remote_ref = format!("refs/remotes/origin/{}", branch);
                if !self
                    .succeeds(&["show-ref", "--verify", "--quiet", &remote_ref])
                    .await
                {
                    return None;
                }
                format!("origin/{}", branch)
            }
        };
        let range = format!("{}...{}", upstream, branch);
        let line = self
            .text(&["rev-list", "--left-right", "--count", &range])
            .await?;
        parse_divergence(&line)
    }
}

/// Counts porcelain v1 lines: `??` is untracked, anything else modified.
pub fn parse_porcelain(output: &str) -> Changes {
    output
        .lines()
        .filter(|l| !l.is_empty())
        .fold(Changes::default(), |mut acc, line| {
            if line.starts_with("??") {
                acc.untracked += 1;
            } else {
                acc.modified += 1;
            }
            acc
        })
}

/// Parses `%h%x09%ct%x09%an%x09%s`.
pub fn parse_last_commit(line: &str) -> Option<LastCommit> {
    let mut parts = line.splitn(4, '\t');
    let hash = parts.next()?.trim().to_string();
    if hash.is_empty() {
        return None;
    }
    Some(LastCommit {
        hash,
        time: parts.next().and_then(|t| t.trim().parse().ok()).unwrap_or(0),
        author: parts.next().unwrap_or_default().to_string(),
        subject: parts.next().unwrap_or_default().to_string(),
    })
}

/// `rev-list --left-right --count upstream...local` prints `behind ahead`.
pub fn parse_divergence(line: &str) -> Option<Divergence> {
    let mut nums = line.split_whitespace().map(|n| n.parse::<u64>());
    let behind = nums.next()?.ok()?;
    let ahead = nums.next()?.ok()?;
    Some(Divergence { ahead, behind })
}

/// Reads branch and 7-char commit straight from `.git`.
pub fn parse_head(dir: &Path) -> (Option<String>, Option<String>) {
    let git_dir = dir.join(".git");
    let Ok(head) = fs::read_to_string(git_dir.join("HEAD")) else {
        return (None, None);
    };
    let head = head.trim();
    match head.strip_prefix("ref:") {
        Some(reference) => {
            let reference = reference.trim();
            let branch = reference
                .strip_prefix("refs/heads/")
                .unwrap_or(reference)
                .to_string();
            let commit = fs::read_to_string(git_dir.join(reference))
                .ok()
                .map(|h| h.trim().to_string())
                .or_else(|| packed_ref(&git_dir, reference))
                .filter(|h| !h.is_empty())
                .map(|h| short(&h));
            let branch = if branch.is_empty() { "HEAD".to_string() } else { branch };
            (Some(branch), commit)
        }
        None => (
            Some("HEAD".to_string()),
            (!head.is_empty()).then(|| short(head)),
        ),
    }
}

fn packed_ref(git_dir: &Path, reference: &str) -> Option<String> {
    let packed = fs::read_to_string(git_dir.join("packed-refs")).ok()?;
    packed.lines().find_map(|line| {
        let (hash, name) = line.split_once(' ')?;
        (name.trim() == reference && !hash.starts_with('#')).then(|| hash.to_string())
    })
}

fn short(hash: &str) -> String {
    hash.chars().take(7).collect()
}

/// Snapshot for one directory.
pub async fn status_for_dir(ctx: &AppContext, dir: &Path, quick: bool) -> GitStatus {
    let mut status = GitStatus::default();
    if !dir.join(".git").exists() {
        return status;
    }
    status.is_git = true;

    if let Some(git) = ctx.runner.locate("git") {
        let probe = GitProbe {
            runner: ctx.runner.as_ref(),
            git,
            dir,
            timeout: ctx.git_timeout(),
            cancel: &ctx.shutdown,
        };
        if probe.text(&["rev-parse", "--is-inside-work-tree"]).await.as_deref() == Some("true") {
            let branch = probe
                .text(&["rev-parse", "--abbrev-ref", "HEAD"])
                .await
                .unwrap_or_else(|| "HEAD".to_string());
            status.commit = probe.text(&["rev-parse", "--short=7", "HEAD"]).await;

            if !quick {
                status.describe = probe
                    .text(&["describe", "--always", "--dirty", "--abbrev=7"])
                    .await;
                status.last_commit = probe
                    .text(&["log", "-1", "--pretty=%h%x09%ct%x09%an%x09%s"])
                    .await
                    .and_then(|l| parse_last_commit(&l));
                if let Some(out) = probe.output(&["status", "--porcelain=1"]).await {
                    if out.success() {
                        status.changes = parse_porcelain(&out.stdout);
                        status.dirty = status.changes.modified + status.changes.untracked > 0;
                    }
                }
                status.remote = probe.text(&["remote", "-v"]).await.and_then(|rv| {
                    rv.lines()
                        .find(|l| l.contains("(fetch)"))
                        .map(str::to_string)
                });
            }

            status.divergence = probe.divergence(&branch).await;
            status.branch = Some(branch);
            return status;
        }
        debug!("{:?} has .git but is not a work tree; parsing HEAD", dir);
    }

    let (branch, commit) = parse_head(dir);
    status.branch = Some(branch.unwrap_or_else(|| "HEAD".to_string()));
    status.commit = commit;
    status
}

/// Snapshot for a named project (400 on a bad name, 404 if missing).
pub async fn status_for_project(ctx: &AppContext, name: &str, quick: bool) -> Result<GitStatus> {
    let name = name.trim();
    if !sandbox::is_valid_project_name(name) {
        return Err(DashError::invalid("Invalid project").into());
    }
    let dir = ctx.root().join(name);
    if !registry::is_listed_name(&ctx.config, name) || !dir.is_dir() {
        return Err(DashError::not_found("Project not found").into());
    }
    Ok(status_for_dir(ctx, &dir, quick).await)
}

/// Snapshots for every project, natural-sorted by name.
pub async fn status_all(ctx: &AppContext, quick: bool) -> Result<Vec<GitStatusItem>> {
    let names = registry::project_names(&ctx.config)?;
    let limit = Arc::new(Semaphore::new(PARALLEL_PROBES));
    let mut tasks = JoinSet::new();
    for (index, name) in names.into_iter().enumerate() {
        let ctx = ctx.clone();
        let limit = limit.clone();
        tasks.spawn(async move {
            let _permit = limit.acquire_owned().await;
            let dir = ctx.root().join(&name);
            let status = status_for_dir(&ctx, &dir, quick).await;
            (index, GitStatusItem { project: name, status })
        });
    }

    let mut items = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(item) => items.push(item),
            Err(e) => warn!("Git status task failed: {}", e),
        }
    }
    items.sort_by_key(|(index, _)| *index);
    Ok(items.into_iter().map(|(_, item)| item).collect())
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::process::fake::ScriptedRunner;
    use crate::core::context::tests::test_context;
    use tempfile::tempdir;

    #[test]
    fn test_parse_porcelain() {
        let out = " M src/main.rs\n?? new.txt\nA  added.rs\n?? other\n";
        assert_eq!(parse_porcelain(out), Changes { modified: 2, untracked: 2 });
        assert_eq!(parse_porcelain(""), Changes::default());
    }

    #[test]
    fn test_parse_last_commit() {
        let lc = parse_last_commit("abc1234\t1700000000\tJane Doe\tFix: tabs\tin subject").unwrap();
        assert_eq!(lc.hash, "abc1234");
        assert_eq!(lc.time, 1_700_000_000);
        assert_eq!(lc.author, "Jane Doe");
        assert_eq!(lc.subject, "Fix: tabs\tin subject");
        assert!(parse_last_commit("").is_none());
    }

    #[test]
    fn test_parse_divergence() {
        assert_eq!(parse_divergence("3\t5"), Some(Divergence { ahead: 5, behind: 3 }));
        assert_eq!(parse_divergence("garbage"), None);
    }

    #[test]
    fn test_parse_head_variants() -> Result<()> {
        let dir = tempdir()?;
        let git = dir.path().join(".git");
        fs::create_dir_all(git.join("refs/heads/feature"))?;

        fs::write(git.join("HEAD"), "ref: refs/heads/feature/login\n")?;
        fs::write(git.join("refs/heads/feature/login"), "0123456789abcdef\n")?;
        assert_eq!(
            parse_head(dir.path()),
            (Some("feature/login".into()), Some("0123456".into()))
        );

        fs::write(git.join("HEAD"), "ref: refs/heads/main\n")?;
        fs::write(
            git.join("packed-refs"),
            "# pack-refs with: peeled fully-peeled sorted\nfedcba9876543210 refs/heads/main\n",
        )?;
        assert_eq!(parse_head(dir.path()), (Some("main".into()), Some("fedcba9".into())));

        fs::write(git.join("HEAD"), "deadbeefcafe\n")?;
        assert_eq!(parse_head(dir.path()), (Some("HEAD".into()), Some("deadbee".into())));
        Ok(())
    }

    #[tokio::test]
    async fn test_no_git_dir_starts_no_process() {
        let root = tempdir().unwrap();
        let cache = tempdir().unwrap();
        fs::create_dir(root.path().join("plain")).unwrap();
        let runner = Arc::new(ScriptedRunner::with_programs(&["git"]));
        let ctx = test_context(root.path(), cache.path()).with_runner(runner.clone());

        let status = status_for_project(&ctx, "plain", false).await.unwrap();
        assert!(!status.is_git);
        assert_eq!(status.branch, None);
        assert_eq!(status.commit, None);
        assert!(runner.recorded().is_empty());

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["is_git"], false);
        assert!(json["branch"].is_null());
        assert!(json["commit"].is_null());
    }

    #[tokio::test]
    async fn test_full_snapshot_with_scripted_git() {
        let root = tempdir().unwrap();
        let cache = tempdir().unwrap();
        fs::create_dir_all(root.path().join("app/.git")).unwrap();
        let runner = Arc::new(
            ScriptedRunner::with_programs(&["git"])
                .reply("rev-parse --is-inside-work-tree", 0, "true\n")
                .reply("rev-parse --abbrev-ref HEAD", 0, "main\n")
                .reply("rev-parse --short=7 HEAD", 0, "abc1234\n")
                .reply("describe --always --dirty --abbrev=7", 0, "abc1234-dirty\n")
                .reply("log -1 --pretty=%h%x09%ct%x09%an%x09%s", 0, "abc1234\t1700000000\tJane\tInit\n")
                .reply("status --porcelain=1", 0, " M a.txt\n?? b.txt\n")
                .reply(
                    "remote -v",
                    0,
                    "origin\tgit@host:app.git (fetch)\norigin\tgit@host:app.git (push)\n",
                )
                .reply("show-ref --verify --quiet refs/remotes/origin/main", 0, "")
                .reply("rev-list --left-right --count origin/main...main", 0, "1\t2\n"),
        );
        let ctx = test_context(root.path(), cache.path()).with_runner(runner.clone());

        let status = status_for_project(&ctx, "app", false).await.unwrap();
        assert!(status.is_git);
        assert_eq!(status.branch.as_deref(), Some("main"));
        assert_eq!(status.commit.as_deref(), Some("abc1234"));
        assert_eq!(status.describe.as_deref(), Some("abc1234-dirty"));
        assert_eq!(status.last_commit.as_ref().unwrap().author, "Jane");
        assert!(status.dirty);
        assert_eq!(status.changes, Changes { modified: 1, untracked: 1 });
        assert_eq!(status.remote.as_deref(), Some("origin\tgit@host:app.git (fetch)"));
        assert_eq!(status.divergence, Some(Divergence { ahead: 2, behind: 1 }));
    }

    #[tokio::test]
    async fn test_quick_mode_skips_costly_commands() {
        let root = tempdir().unwrap();
        let cache = tempdir().unwrap();
        fs::create_dir_all(root.path().join("app/.git")).unwrap();
        let runner = Arc::new(
            ScriptedRunner::with_programs(&["git"])
                .reply("rev-parse --is-inside-work-tree", 0, "true")
                .reply("rev-parse --abbrev-ref HEAD", 0, "HEAD")
                .reply("rev-parse --short=7 HEAD", 0, "abc1234"),
        );
        let ctx = test_context(root.path(), cache.path()).with_runner(runner.clone());
        let status = status_for_project(&ctx, "app", true).await.unwrap();
        assert_eq!(status.branch.as_deref(), Some("HEAD"));
        assert_eq!(status.divergence, None);
        let calls = runner.recorded();
        assert_eq!(calls.len(), 3);
        assert!(!calls.iter().any(|c| c.starts_with("status") || c.starts_with("log")));
    }

    #[tokio::test]
    async fn test_falls_back_to_head_without_binary() {
        let root = tempdir().unwrap();
        let cache = tempdir().unwrap();
        let git = root.path().join("app/.git");
        fs::create_dir_all(git.join("refs/heads")).unwrap();
        fs::write(git.join("HEAD"), "ref: refs/heads/dev\n").unwrap();
        fs::write(git.join("refs/heads/dev"), "1111111222\n").unwrap();
        let runner = Arc::new(ScriptedRunner::default());
        let ctx = test_context(root.path(), cache.path()).with_runner(runner);
        let status = status_for_project(&ctx, "app", false).await.unwrap();
        assert_eq!(status.branch.as_deref(), Some("dev"));
        assert_eq!(status.commit.as_deref(), Some("1111111"));
        assert_eq!(status.describe, None);
    }

    #[tokio::test]
    async fn test_project_errors_and_all_mode() {
        let root = tempdir().unwrap();
        let cache = tempdir().unwrap();
        for name in ["b10", "b2", "_dashboard"] {
            fs::create_dir(root.path().join(name)).unwrap();
        }
        let ctx = test_context(root.path(), cache.path());
        let err = status_for_project(&ctx, "bad name", false).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid project");
        let err = status_for_project(&ctx, "_dashboard", false).await.unwrap_err();
        assert_eq!(err.to_string(), "Project not found");

        let items = status_all(&ctx, true).await.unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.project.as_str()).collect();
        assert_eq!(names, vec!["b2", "b10"]);
        let json = serde_json::to_value(&items[0]).unwrap();
        assert_eq!(json["project"], "b2");
        assert_eq!(json["is_git"], false);
    }
}
