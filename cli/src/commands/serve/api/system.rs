//! System endpoints: service health, store diagnostics and the schema.
use crate::commands::serve::conditional::{self, Validators};
use crate::commands::serve::response::{ok, query_flag, ApiResult};
use crate::core::context::AppContext;
use crate::dashboard::registry::short_hash;
use crate::dashboard::{health, schema};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::collections::HashMap;

const SCHEMA_CACHE_CONTROL: &str = "max-age=60, must-revalidate";

pub async fn services(
    State(ctx): State<AppContext>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult {
    let report = health::services(&ctx, query_flag(&params, "http")).await?;
    let meta = report.meta();
    ok(report, meta)
}

pub async fn ping(State(ctx): State<AppContext>) -> ApiResult {
    let report = health::ping(&ctx).await;
    ok(report, json!({"time": chrono::Local::now().to_rfc3339()}))
}

pub async fn redis_debug(State(ctx): State<AppContext>) -> ApiResult {
    ok(health::store_debug(&ctx).await, json!({}))
}

fn wants_openapi(params: &HashMap<String, String>, headers: &HeaderMap) -> bool {
    params.get("format").is_some_and(|f| f == "openapi")
        || headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| accept.contains("profile=openapi"))
}

/// `GET schema.php`, the endpoint catalogue or its OpenAPI rendering.
pub async fn schema(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult {
    let body = if wants_openapi(&params, &headers) {
        schema::openapi()
    } else {
        let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
        json!({
            "ok": true,
            "version": schema::API_VERSION,
            "data": {"schema": schema::internal_schema()},
            "meta": {"baseUrl": schema::base_url(ctx.config.server.base_url.as_deref(), host)},
        })
    };

    let validators = Validators::etag(short_hash(&body, 16));
    if conditional::etag_matches(&headers, &validators) {
        return Ok(with_cache_control(validators.not_modified()));
    }
    let mut res = Json::<Value>(body).into_response();
    validators.apply(res.headers_mut());
    Ok(with_cache_control(res))
}

fn with_cache_control(mut res: Response) -> Response {
    res.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(SCHEMA_CACHE_CONTROL),
    );
    res
}
