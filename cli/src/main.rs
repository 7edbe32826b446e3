//! # DevDash Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! Entry point of the DevDash CLI, the backend of a local development
//! dashboard for a directory of web projects. It handles:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Routing execution to the command handlers
//!
//! ## Examples
//!
//! ```bash
//! # Run the dashboard for ~/htdocs
//! devdash serve ~/htdocs
//!
//! # List projects with more logging
//! devdash -vv projects --root ~/htdocs
//! ```
//!
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod common;
mod core;
mod dashboard;

/// Top-level command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "devdash",
    about = "🧭 DevDash: Local Development Dashboard",
    long_about = "Serve a dashboard API for the web projects in a document root:\n\
                  browse and edit files, check git and service status, scaffold new projects.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Parser, Debug)]
enum Commands {
    #[command(alias = "s")]
    Serve(commands::serve::ServeArgs),
    #[command(alias = "p")]
    Projects(commands::projects::ProjectsArgs),
    Git(commands::git::GitArgs),
    #[command(alias = "c")]
    Create(commands::create::CreateArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let command_result = match cli.command {
        Commands::Serve(args) => commands::serve::handle_serve(args).await,
        Commands::Projects(args) => commands::projects::handle_projects(args).await,
        Commands::Git(args) => commands::git::handle_git(args).await,
        Commands::Create(args) => commands::create::handle_create(args).await,
    };

    if let Err(e) = command_result {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
