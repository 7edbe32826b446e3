//! File endpoints: tree listing and the project file operations.
use super::blocking;
use crate::commands::serve::response::{ok, ApiResult, Payload};
use crate::core::context::AppContext;
use crate::dashboard::{files, listing, sandbox};
use axum::extract::{Query, State};
use serde_json::json;
use std::collections::HashMap;

type Params = Query<HashMap<String, String>>;

fn param(params: &HashMap<String, String>, key: &str) -> String {
    params.get(key).cloned().unwrap_or_default()
}

pub async fn list(State(ctx): State<AppContext>, Query(params): Params) -> ApiResult {
    let project = param(&params, "project");
    let requested = params.get("depth").and_then(|d| d.trim().parse::<i64>().ok());
    let cfg = ctx.config.clone();
    let name = project.clone();

    let tree = blocking(move || {
        let root = sandbox::project_root(&cfg.root, &name)?;
        let depth = listing::clamp_depth(requested, cfg.listing.max_depth_limit);
        listing::list_project(&root, depth, &cfg.listing.ignore)
    })
    .await?;

    let meta = json!({
        "count": tree.flat.len(),
        "files": tree.file_count(),
        "dirs": tree.dir_count(),
        "depth": tree.depth,
    });
    ok(
        json!({"project": project, "tree": tree.flat, "nested": tree.nested}),
        meta,
    )
}

pub async fn read(State(ctx): State<AppContext>, Query(params): Params) -> ApiResult {
    let project = param(&params, "project");
    let path = param(&params, "path");
    let cfg = ctx.config.clone();
    let file = blocking(move || files::read(&cfg, &project, &path)).await?;
    let size = file.size;
    ok(file, json!({"size": size}))
}

pub async fn write(State(ctx): State<AppContext>, payload: Payload) -> ApiResult {
    let project = payload.text_or_empty("project");
    let path = payload.text_or_empty("path");
    let cfg = ctx.config.clone();

    if payload.flag("mkdir") {
        let created = blocking(move || files::make_dir(&cfg, &project, &path)).await?;
        return ok(created, json!({}));
    }

    let content = payload.text("content");
    let written = blocking(move || files::write(&cfg, &project, &path, content.as_deref())).await?;
    ok(written, json!({}))
}

pub async fn rename(State(ctx): State<AppContext>, payload: Payload) -> ApiResult {
    let project = payload.text_or_empty("project");
    let old = payload.text_or_empty("oldPath");
    let new = payload.text_or_empty("newPath");
    let cfg = ctx.config.clone();
    let renamed = blocking(move || files::rename(&cfg, &project, &old, &new)).await?;
    ok(renamed, json!({}))
}

pub async fn delete(State(ctx): State<AppContext>, payload: Payload) -> ApiResult {
    let project = payload.text_or_empty("project");
    let path = payload.text_or_empty("path");
    let trash = payload.flag("trash");
    let cfg = ctx.config.clone();
    let deleted = blocking(move || files::delete(&cfg, &project, &path, trash)).await?;
    ok(deleted, json!({}))
}
