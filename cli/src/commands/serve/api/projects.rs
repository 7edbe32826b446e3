//! Project endpoints: listing, git status and scaffolding.
use crate::commands::serve::conditional::{self, Validators};
use crate::commands::serve::response::{ok, query_flag, ApiResult, Payload};
use crate::core::context::AppContext;
use crate::dashboard::registry::{self, ProjectQuery};
use crate::dashboard::scaffold::{self, CreateOptions, CreateRequest};
use crate::dashboard::git;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::json;
use std::collections::HashMap;

fn int_param(params: &HashMap<String, String>, key: &str) -> Option<i64> {
    params.get(key).and_then(|v| v.trim().parse().ok())
}

/// `GET projects.php`, answering 304 when the client's validators match.
pub async fn list(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult {
    let query = ProjectQuery::new(
        params.get("q").map(String::as_str),
        params.get("sort").map(String::as_str),
        params.get("order").map(String::as_str),
        int_param(&params, "limit"),
        int_param(&params, "offset"),
        ctx.config.projects.max_limit,
    );
    let page = registry::list_projects(&ctx, &query).await?;

    let validators = Validators::etag(page.etag.clone()).with_last_modified(page.last_modified);
    if conditional::is_not_modified(&headers, &validators) {
        return Ok(validators.not_modified());
    }

    let meta = json!({
        "query": page.query,
        "total": page.total,
        "count": page.count,
        "lastModified": page.last_modified,
        "etag": page.etag,
    });
    let mut res: Response = ok(json!({"projects": page.projects}), meta)?;
    validators.apply(res.headers_mut());
    Ok(res)
}

/// `GET git_status.php[?project=NAME][&quick=1]`.
pub async fn git_status(
    State(ctx): State<AppContext>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult {
    let quick = query_flag(&params, "quick");
    match params.get("project").map(|p| p.trim()).filter(|p| !p.is_empty()) {
        Some(project) => {
            let status = git::status_for_project(&ctx, project, quick).await?;
            ok(json!({"project": project, "status": status}), json!({"quick": quick}))
        }
        None => {
            let items = git::status_all(&ctx, quick).await?;
            let count = items.len();
            ok(json!({"items": items}), json!({"count": count, "quick": quick}))
        }
    }
}

/// `POST projects_create.php` with `{name, type, options}`.
pub async fn create(State(ctx): State<AppContext>, payload: Payload) -> ApiResult {
    let options = payload.section("options");
    let request = CreateRequest::new(payload.text_or_empty("name"), payload.text_or_empty("type"))
        .with_options(CreateOptions {
            init_git: options.flag("initGit"),
            add_readme: options.flag("addReadme"),
            symfony_preset: options.text("symfonyPreset"),
            symfony_version: options.text("symfonyVersion"),
        });
    let created = scaffold::create(&ctx, &request).await?;
    ok(json!({"project": created}), json!({}))
}
