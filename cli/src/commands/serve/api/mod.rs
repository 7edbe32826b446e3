//! # DevDash API Router
//!
//! File: cli/src/commands/serve/api/mod.rs
//!
//! ## Overview
//!
//! The JSON endpoints mounted under `/_dashboard/api`. Handlers stay thin:
//! they pull parameters out of the query string or `Payload`, call into
//! `crate::dashboard`, and wrap the result in the response envelope.
//!
//! ## Architecture
//!
//! - `files`: list, read, write, rename, delete
//! - `projects`: listing with conditional GET, git status, creation
//! - `system`: services, ping, store debug, schema
//!
//! Mutating endpoints accept only `POST`; any other method gets the JSON 405.
//! Unknown paths under the prefix get a JSON 404.
//!
mod files;
mod projects;
mod system;

use super::response::{post_only, security_headers, unknown_endpoint};
use crate::core::context::AppContext;
use crate::core::error::Result;
use anyhow::Context;
use axum::middleware::map_response;
use axum::routing::{get, post};
use axum::Router;

/// Builds the API router; the caller nests it under `/_dashboard/api`.
pub fn router() -> Router<AppContext> {
    Router::new()
        .route("/files/list.php", get(files::list))
        .route("/files/read.php", get(files::read))
        .route("/files/write.php", post(files::write).fallback(post_only))
        .route("/files/rename.php", post(files::rename).fallback(post_only))
        .route("/files/delete.php", post(files::delete).fallback(post_only))
        .route("/git_status.php", get(projects::git_status))
        .route("/projects.php", get(projects::list))
        .route(
            "/projects_create.php",
            post(projects::create).fallback(post_only),
        )
        .route("/services.php", get(system::services))
        .route("/ping.php", get(system::ping))
        .route("/redis_debug.php", get(system::redis_debug))
        .route("/schema.php", get(system::schema))
        .fallback(unknown_endpoint)
        .layer(map_response(security_headers))
}

/// Runs filesystem work off the async workers.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("Filesystem task panicked")?
}
