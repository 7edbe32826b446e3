//! # DevDash API Responses
//!
//! File: cli/src/commands/serve/response.rs
//!
//! ## Overview
//!
//! The JSON envelope shared by every endpoint and the glue between service
//! errors and HTTP:
//!
//! - success: `{ok: true, version, data, meta}`
//! - failure: `{ok: false, version, error}`
//!
//! `ApiError` wraps any `anyhow::Error`. A `DashError` inside it selects the
//! status code and its message is shown as is; anything else becomes a logged
//! 500 "Server error: ...".
//!
//! `Payload` reads a request body sent either as JSON or as an urlencoded
//! form, so the dashboard and plain HTML forms can both talk to the API.
//!
use crate::core::error::DashError;
use crate::dashboard::schema::API_VERSION;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::{debug, error};

pub type ApiResult = std::result::Result<Response, ApiError>;

/// Error type returned by every handler.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0.downcast_ref::<DashError>() {
            Some(kind) => {
                let status = kind.status();
                if status.is_server_error() {
                    error!("Request failed: {:#}", self.0);
                } else {
                    debug!("Request rejected ({}): {}", status, kind);
                }
                (status, kind.to_string())
            }
            None => {
                error!("Request failed: {:#}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Server error: {}", self.0),
                )
            }
        };
        error_response(status, &message)
    }
}

pub fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"ok": false, "version": API_VERSION, "error": message})),
    )
        .into_response()
}

/// `{ok: true, version, data, meta}` with status 200.
pub fn ok<T: Serialize>(data: T, meta: Value) -> ApiResult {
    let data = serde_json::to_value(data)?;
    Ok(Json(json!({"ok": true, "version": API_VERSION, "data": data, "meta": meta})).into_response())
}

/// Headers added to every API response.
pub async fn security_headers(mut res: Response) -> Response {
    let headers = res.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    res
}

/// Answer for mutating endpoints called with the wrong method.
pub async fn post_only() -> Response {
    ApiError::from(DashError::MethodNotAllowed("POST only".into())).into_response()
}

pub async fn unknown_endpoint() -> Response {
    error_response(StatusCode::NOT_FOUND, "Unknown endpoint")
}

/// Loose boolean: `true`, non-zero numbers and `"1"`, `"true"`, `"yes"`, `"on"`.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => truthy_str(s),
        _ => false,
    }
}

pub fn truthy_str(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Query flag such as `?quick=1` or `?http=true`.
pub fn query_flag(query: &HashMap<String, String>, key: &str) -> bool {
    query.get(key).is_some_and(|v| truthy_str(v))
}

/// A request body decoded from JSON or `application/x-www-form-urlencoded`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload(pub Map<String, Value>);

impl Payload {
    /// String field; numbers are accepted and rendered as text.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Like `text`, but absent means empty.
    pub fn text_or_empty(&self, key: &str) -> String {
        self.text(key).unwrap_or_default()
    }

    pub fn flag(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(truthy)
    }

    /// A nested object (`{"options": {...}}` in JSON, `options[key]=...` in forms).
    pub fn section(&self, key: &str) -> Payload {
        if let Some(Value::Object(map)) = self.0.get(key) {
            return Payload(map.clone());
        }
        let prefix = format!("{}[", key);
        Payload(
            self.0
                .iter()
                .filter_map(|(k, v)| {
                    let inner = k.strip_prefix(&prefix)?.strip_suffix(']')?;
                    Some((inner.to_string(), v.clone()))
                })
                .collect(),
        )
    }
}

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(&req) {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| DashError::invalid(format!("Invalid form body: {}", e.body_text())))?;
            return Ok(Payload(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            ));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| DashError::invalid(format!("Invalid body: {}", e.body_text())))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Payload::default());
        }
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(Payload(map)),
            _ => Err(DashError::invalid("Invalid JSON body").into()),
        }
    }
}
