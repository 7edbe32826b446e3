//! # DevDash Serve Command
//!
//! File: cli/src/commands/serve/mod.rs
//!
//! ## Overview
//!
//! `devdash serve` runs the dashboard backend: the JSON API that lists and
//! edits projects, reports git and service status and scaffolds new
//! projects, plus the built dashboard frontend.
//!
//! ## Architecture
//!
//! - `config`: CLI arguments merged over the file/env configuration
//! - `server_logic`: startup, port fallback, router, shutdown
//! - `api`: endpoint handlers
//! - `response`: JSON envelope, error mapping, request bodies
//! - `conditional`: ETag / Last-Modified handling
//! - `frontend`: static files under `/_dashboard/`
//!
//! ## Examples
//!
//! ```bash
//! devdash serve ~/htdocs --port 8080
//! ```
//!
mod api;
mod conditional;
mod config;
mod frontend;
mod response;
mod server_logic;

pub use config::ServeArgs;

use crate::core::error::Result;
use tracing::info;

/// # Handle Serve Command (`handle_serve`)
pub async fn handle_serve(args: ServeArgs) -> Result<()> {
    info!("Handling serve command for root {:?}", args.root);
    let config = config::load_and_merge_config(&args)?;
    server_logic::run_server(config).await
}
