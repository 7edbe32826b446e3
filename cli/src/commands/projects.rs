//! # DevDash Projects Command
//!
//! File: cli/src/commands/projects.rs
//!
//! ## Overview
//!
//! `devdash projects` prints the projects of a document root, with the same
//! filter, sort and paging options as the dashboard's project list.
//!
//! ## Examples
//!
//! ```bash
//! devdash projects --root ~/htdocs
//! devdash projects --filter shop --sort mtime --order desc
//! devdash projects --json
//! ```
//!
//! Example output:
//!
//! ```text
//! Name         | Type                      | URL
//! -------------+---------------------------+--------------------
//! blog         | Plain PHP                 | /blog/
//! shop         | Symfony/Laravel (public)  | /shop/public/
//!
//! 2 of 2 project(s).
//! ```
//!
use super::RootArgs;
use crate::core::error::Result;
use crate::dashboard::registry::{self, Project, ProjectPage, ProjectQuery};
use clap::Parser;
use tracing::info;

/// # Projects Arguments (`ProjectsArgs`)
#[derive(Parser, Debug)]
pub struct ProjectsArgs {
    #[command(flatten)]
    pub root: RootArgs,

    /// Case-insensitive filter over name, type, entry and URL.
    #[arg(long, short)]
    pub filter: Option<String>,

    /// name, type, mtime or createdAt.
    #[arg(long)]
    pub sort: Option<String>,

    /// asc or desc.
    #[arg(long)]
    pub order: Option<String>,

    #[arg(long)]
    pub limit: Option<i64>,

    #[arg(long)]
    pub offset: Option<i64>,

    /// Print the raw result as JSON.
    #[arg(long)]
    pub json: bool,
}

/// # Handle Projects Command (`handle_projects`)
pub async fn handle_projects(args: ProjectsArgs) -> Result<()> {
    info!("Handling projects command...");
    let ctx = args.root.context()?;
    let query = ProjectQuery::new(
        args.filter.as_deref(),
        args.sort.as_deref(),
        args.order.as_deref(),
        args.limit,
        args.offset,
        ctx.config.projects.max_limit,
    );
    let page = registry::list_projects(&ctx, &query).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        print_project_table(&page);
    }
    Ok(())
}

fn print_project_table(page: &ProjectPage) {
    if page.projects.is_empty() {
        println!("No projects found.");
        return;
    }

    let width = |f: fn(&Project) -> usize, header: &str| {
        page.projects.iter().map(f).max().unwrap_or(0).max(header.len())
    };
    let name_w = width(|p| p.name.len(), "Name");
    let type_w = width(|p| p.kind.len(), "Type");

    println!("{:<name_w$} | {:<type_w$} | URL", "Name", "Type");
    println!("{}-+-{}-+-{}", "-".repeat(name_w), "-".repeat(type_w), "-".repeat(20));
    for p in &page.projects {
        println!("{:<name_w$} | {:<type_w$} | {}", p.name, p.kind, p.url);
    }
    println!("\n{} of {} project(s).", page.count, page.total);
}
