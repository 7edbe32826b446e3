//! # DevDash Conditional GET
//!
//! File: cli/src/commands/serve/conditional.rs
//!
//! ## Overview
//!
//! Validators for cacheable GET endpoints. A response carries
//! `ETag: "<tag>"` and optionally an RFC 1123 `Last-Modified`; a request whose
//! `If-None-Match` names the tag, or whose `If-Modified-Since` is not older
//! than the last modification, gets an empty 304.
//!
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, TimeZone, Utc};

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    /// Tag without quotes.
    pub etag: String,
    /// Unix seconds, when the resource has a meaningful modification time.
    pub last_modified: Option<i64>,
}

impl Validators {
    pub fn etag(tag: impl Into<String>) -> Self {
        Self {
            etag: tag.into(),
            last_modified: None,
        }
    }

    pub fn with_last_modified(mut self, secs: i64) -> Self {
        self.last_modified = Some(secs);
        self
    }

    fn quoted(&self) -> String {
        format!("\"{}\"", self.etag)
    }

    /// Adds `ETag` and `Last-Modified` to `headers`.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if let Ok(v) = HeaderValue::from_str(&self.quoted()) {
            headers.insert(header::ETAG, v);
        }
        if let Some(date) = self.last_modified.and_then(http_date) {
            if let Ok(v) = HeaderValue::from_str(&date) {
                headers.insert(header::LAST_MODIFIED, v);
            }
        }
    }

    /// The empty 304 answer, still carrying the validators.
    pub fn not_modified(&self) -> Response {
        let mut res = StatusCode::NOT_MODIFIED.into_response();
        self.apply(res.headers_mut());
        res
    }
}

/// Formats unix seconds as an HTTP date (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn http_date(secs: i64) -> Option<String> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(|dt| dt.format(HTTP_DATE).to_string())
}

/// Parses an HTTP date back into unix seconds.
pub fn parse_http_date(raw: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|dt| dt.timestamp())
}

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// True when `If-None-Match` lists the tag (or `*`).
pub fn etag_matches(headers: &HeaderMap, v: &Validators) -> bool {
    let Some(raw) = header_str(headers, header::IF_NONE_MATCH) else {
        return false;
    };
    raw.split(',').map(str::trim).any(|candidate| {
        let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
        candidate == "*" || candidate.trim_matches('"') == v.etag
    })
}

/// True when the client's copy is current by either validator.
pub fn is_not_modified(headers: &HeaderMap, v: &Validators) -> bool {
    if etag_matches(headers, v) {
        return true;
    }
    match (v.last_modified, header_str(headers, header::IF_MODIFIED_SINCE)) {
        (Some(modified), Some(raw)) => parse_http_date(raw).is_some_and(|since| since >= modified),
        _ => false,
    }
}
