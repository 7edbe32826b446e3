//! # DevDash Git Command
//!
//! File: cli/src/commands/git.rs
//!
//! ## Overview
//!
//! `devdash git [PROJECT]` shows the git snapshot the dashboard displays:
//! branch, commit, dirty state and divergence from upstream.
//!
//! ## Examples
//!
//! ```bash
//! devdash git                # every project
//! devdash git shop --quick   # one project, skip describe/log/status/remote
//! devdash git shop --json
//! ```
//!
use super::RootArgs;
use crate::core::error::Result;
use crate::dashboard::git::{self, GitStatus};
use clap::Parser;
use serde_json::json;
use tracing::info;

/// # Git Arguments (`GitArgs`)
#[derive(Parser, Debug)]
pub struct GitArgs {
    /// Project directory name; all projects when omitted.
    pub project: Option<String>,

    #[command(flatten)]
    pub root: RootArgs,

    /// Only branch, commit and divergence.
    #[arg(long)]
    pub quick: bool,

    #[arg(long)]
    pub json: bool,
}

/// # Handle Git Command (`handle_git`)
pub async fn handle_git(args: GitArgs) -> Result<()> {
    info!("Handling git command for {:?}", args.project);
    let ctx = args.root.context()?;

    match args.project.as_deref() {
        Some(project) => {
            let status = git::status_for_project(&ctx, project, args.quick).await?;
            if args.json {
                let out = json!({"project": project, "status": status});
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{}", summary_line(project, &status));
            }
        }
        None => {
            let items = git::status_all(&ctx, args.quick).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&json!({"items": items}))?);
            } else {
                let width = items.iter().map(|i| i.project.len()).max().unwrap_or(0);
                for item in &items {
                    println!("{}", summary_line(&format!("{:<width$}", item.project), &item.status));
                }
            }
        }
    }
    Ok(())
}

/// One human-readable line per project.
fn summary_line(project: &str, status: &GitStatus) -> String {
    if !status.is_git {
        return format!("{}  (not a git repository)", project);
    }
    let mut line = format!(
        "{}  {} @ {}",
        project,
        status.branch.as_deref().unwrap_or("?"),
        status.commit.as_deref().unwrap_or("?")
    );
    if status.dirty {
        line.push_str(&format!(
            "  dirty ({} modified, {} untracked)",
            status.changes.modified, status.changes.untracked
        ));
    }
    if let Some(div) = &status.divergence {
        if div.ahead > 0 || div.behind > 0 {
            line.push_str(&format!("  ↑{} ↓{}", div.ahead, div.behind));
        }
    }
    line
}
