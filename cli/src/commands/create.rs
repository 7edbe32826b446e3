//! # DevDash Create Command
//!
//! File: cli/src/commands/create.rs
//!
//! ## Overview
//!
//! `devdash create NAME --type KIND` scaffolds a project the same way the
//! dashboard's "new project" dialog does: template files for plain PHP and
//! HTML, composer for Symfony, npm/vite for Vue.
//!
//! ## Examples
//!
//! ```bash
//! devdash create landing --type plain-html --readme
//! devdash create shop --type symfony --preset api --symfony-version 7.2 --git
//! ```
//!
use super::RootArgs;
use crate::core::error::Result;
use crate::dashboard::scaffold::{self, CreateOptions, CreateRequest};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// # Create Arguments (`CreateArgs`)
#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// Directory name of the new project.
    pub name: String,

    #[arg(
        long = "type",
        short = 't',
        value_parser = ["plain-php", "plain-html", "symfony", "vue"],
        default_value = "plain-php"
    )]
    pub kind: String,

    #[command(flatten)]
    pub root: RootArgs,

    /// Initialise a git repository with a first commit.
    #[arg(long)]
    pub git: bool,

    /// Write a README.md.
    #[arg(long)]
    pub readme: bool,

    /// Symfony preset: webapp, api or minimal.
    #[arg(long)]
    pub preset: Option<String>,

    /// Symfony version constraint, e.g. 7.2.
    #[arg(long)]
    pub symfony_version: Option<String>,
}

/// # Handle Create Command (`handle_create`)
pub async fn handle_create(args: CreateArgs) -> Result<()> {
    info!("Handling create command for '{}'", args.name);
    let ctx = args.root.context()?;

    let request = CreateRequest::new(&args.name, &args.kind).with_options(CreateOptions {
        init_git: args.git,
        add_readme: args.readme,
        symfony_preset: args.preset.clone(),
        symfony_version: args.symfony_version.clone(),
    });
    let created = scaffold::create(&ctx, &request).await?;

    let shown = display_path(Path::new(&created.path));
    println!("✅ Created {} project '{}' at {}", created.kind, created.name, shown.display());
    Ok(())
}

/// The path relative to the working directory when that is shorter.
fn display_path(path: &Path) -> PathBuf {
    let Ok(cwd) = std::env::current_dir() else {
        return path.to_path_buf();
    };
    match pathdiff::diff_paths(path, &cwd) {
        Some(rel) if rel.as_os_str().len() < path.as_os_str().len() => {
            debug!("Showing {:?} relative to {:?}", path, cwd);
            rel
        }
        _ => path.to_path_buf(),
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_path_below_cwd_is_relative() {
        let cwd = std::env::current_dir().unwrap();
        let inside = cwd.join("site");
        assert_eq!(display_path(&inside), PathBuf::from("site"));
    }

    #[test]
    fn test_display_path_keeps_shorter_absolute() {
        let root = Path::new("/");
        assert_eq!(display_path(root), PathBuf::from("/"));
    }
}
