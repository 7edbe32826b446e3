//! # DevDash Frontend Serving
//!
//! File: cli/src/commands/serve/frontend.rs
//!
//! ## Overview
//!
//! Serves the built dashboard under `/_dashboard/`. Unknown paths fall back to
//! `index.html` so client-side routes survive a reload. When no build exists
//! yet, a small HTML page explains how to produce one instead of a bare 404.
//!
use crate::core::context::AppContext;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use std::convert::Infallible;
use std::path::Path;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, warn};

const MOUNT: &str = "/_dashboard";

/// Fallback handler for everything outside the API.
pub async fn serve(State(ctx): State<AppContext>, req: Request) -> Response {
    let path = req.uri().path().to_string();
    if path == MOUNT {
        return Redirect::permanent("/_dashboard/").into_response();
    }
    let Some(rest) = path.strip_prefix("/_dashboard/") else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };

    let dir = ctx.config.frontend_dir();
    let index = dir.join("index.html");
    if !index.is_file() {
        debug!("No frontend build at {:?}", dir);
        return Html(missing_build_page(&dir)).into_response();
    }

    let (mut parts, body) = req.into_parts();
    let target = match parts.uri.query() {
        Some(q) => format!("/{}?{}", rest, q),
        None => format!("/{}", rest),
    };
    match target.parse::<Uri>() {
        Ok(uri) => parts.uri = uri,
        Err(e) => {
            warn!("Unusable frontend path {:?}: {}", target, e);
            return (StatusCode::BAD_REQUEST, "Bad path").into_response();
        }
    }

    let service = ServeDir::new(&dir).fallback(ServeFile::new(&index));
    let result: Result<_, Infallible> = service.oneshot(Request::from_parts(parts, body)).await;
    match result {
        Ok(res) => res.map(Body::new),
        Err(never) => match never {},
    }
}

pub async fn redirect_to_dashboard() -> Redirect {
    Redirect::temporary("/_dashboard/")
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn missing_build_page(dir: &Path) -> String {
    let dir = escape_html(&dir.display().to_string());
    format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>DevDash</title></head>
<body style="font-family: sans-serif; max-width: 40rem; margin: 3rem auto;">
<h1>Dashboard build not found</h1>
<p>No <code>index.html</code> in <code>{dir}</code>.</p>
<p>Build the frontend first:</p>
<pre>cd _dashboard
npm install
npm run build</pre>
<p>or start the server with <code>--frontend &lt;dir&gt;</code>. The API is available under
<a href="/_dashboard/api/schema.php"><code>/_dashboard/api/</code></a> either way.</p>
</body>
</html>
"#
    )
}
