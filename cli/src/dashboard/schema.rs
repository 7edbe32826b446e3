//! # DevDash API Schema
//!
//! File: cli/src/dashboard/schema.rs
//!
//! ## Overview
//!
//! A static catalogue of the JSON endpoints, rendered either as the
//! dashboard's own compact schema or as an OpenAPI 3.1 document.
//!
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Version reported in every response envelope and in the schema.
pub const API_VERSION: &str = "1.3.0";

pub const API_TITLE: &str = "DevDash Local API";

/// URL prefix of every endpoint.
pub const API_PREFIX: &str = "/_dashboard/api";

#[derive(Serialize, Debug, Clone, Copy)]
pub struct Param {
    #[serde(rename = "in")]
    pub location: &'static str,
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Serialize, Debug, Clone, Copy)]
pub struct Endpoint {
    pub method: &'static str,
    pub path: &'static str,
    pub summary: &'static str,
    pub tags: &'static [&'static str],
    pub parameters: &'static [Param],
}

const fn query(name: &'static str, required: bool, description: &'static str) -> Param {
    Param { location: "query", name, required, description }
}

const fn body(name: &'static str, required: bool, description: &'static str) -> Param {
    Param { location: "body", name, required, description }
}

pub const ENDPOINTS: &[Endpoint] = &[
    Endpoint {
        method: "GET",
        path: "/_dashboard/api/files/list.php",
        summary: "File tree of a project, flat and nested.",
        tags: &["files"],
        parameters: &[
            query("project", true, "Project directory name"),
            query("depth", false, "Maximum depth (clamped to the configured limit)"),
        ],
    },
    Endpoint {
        method: "GET",
        path: "/_dashboard/api/files/read.php",
        summary: "Read a text file (binary files are flagged, not returned).",
        tags: &["files"],
        parameters: &[
            query("project", true, "Project directory name"),
            query("path", true, "Path relative to the project"),
        ],
    },
    Endpoint {
        method: "POST",
        path: "/_dashboard/api/files/write.php",
        summary: "Write a text file (keeps a .bak of the previous version) or create a directory.",
        tags: &["files"],
        parameters: &[body("payload", true, "{project, path, content, mkdir}")],
    },
    Endpoint {
        method: "POST",
        path: "/_dashboard/api/files/rename.php",
        summary: "Rename or move a file or directory inside a project.",
        tags: &["files"],
        parameters: &[body("payload", true, "{project, oldPath, newPath}")],
    },
    Endpoint {
        method: "POST",
        path: "/_dashboard/api/files/delete.php",
        summary: "Delete a file or directory, or move it to .trash.",
        tags: &["files"],
        parameters: &[body("payload", true, "{project, path, trash}")],
    },
    Endpoint {
        method: "GET",
        path: "/_dashboard/api/git_status.php",
        summary: "Git info for all projects or one project (?project=NAME).",
        tags: &["git"],
        parameters: &[
            query("project", false, "Project directory name"),
            query("quick", false, "If 1: skip describe/log/status/remote"),
        ],
    },
    Endpoint {
        method: "GET",
        path: "/_dashboard/api/projects.php",
        summary: "Projects found in the document root.",
        tags: &["projects"],
        parameters: &[
            query("q", false, "Filter (name/type/entry/url)"),
            query("sort", false, "name|mtime|type|createdAt"),
            query("order", false, "asc|desc"),
            query("limit", false, "1..500"),
            query("offset", false, "Start offset"),
        ],
    },
    Endpoint {
        method: "POST",
        path: "/_dashboard/api/projects_create.php",
        summary: "Scaffold a new project (plain-php, plain-html, symfony, vue).",
        tags: &["projects"],
        parameters: &[body(
            "payload",
            true,
            "{name, type, options{initGit, addReadme, symfonyPreset, symfonyVersion}}",
        )],
    },
    Endpoint {
        method: "GET",
        path: "/_dashboard/api/ping.php",
        summary: "Healthcheck with Redis ping.",
        tags: &["system"],
        parameters: &[],
    },
    Endpoint {
        method: "GET",
        path: "/_dashboard/api/services.php",
        summary: "Service list (TCP) and optional HTTP health from config/services.json.",
        tags: &["system"],
        parameters: &[query("http", false, "If 1, check HTTP URLs from config/services.json")],
    },
    Endpoint {
        method: "GET",
        path: "/_dashboard/api/redis_debug.php",
        summary: "Redis key statistics for the ftx: namespace.",
        tags: &["system"],
        parameters: &[],
    },
    Endpoint {
        method: "GET",
        path: "/_dashboard/api/schema.php",
        summary: "This catalogue; format=openapi for OpenAPI 3.1.",
        tags: &["system"],
        parameters: &[query("format", false, "openapi")],
    },
];

/// The compact schema shown by the dashboard's API page.
pub fn internal_schema() -> Value {
    json!({
        "title": API_TITLE,
        "version": API_VERSION,
        "endpoints": ENDPOINTS,
    })
}

/// OpenAPI 3.1 rendering of the catalogue. Body parameters become a JSON
/// `requestBody`; everything else a string parameter.
pub fn openapi() -> Value {
    let mut paths = Map::new();
    for ep in ENDPOINTS {
        let parameters: Vec<Value> = ep
            .parameters
            .iter()
            .filter(|p| p.location != "body")
            .map(|p| {
                json!({
                    "in": p.location,
                    "name": p.name,
                    "required": p.required,
                    "description": p.description,
                    "schema": {"type": "string"},
                })
            })
            .collect();
        let mut op = json!({
            "summary": ep.summary,
            "tags": ep.tags,
            "parameters": parameters,
            "responses": {
                "200": {
                    "description": "OK",
                    "content": {"application/json": {"schema": {"type": "object"}}},
                }
            },
        });
        if let Some(b) = ep.parameters.iter().find(|p| p.location == "body") {
            op["requestBody"] = json!({
                "required": b.required,
                "content": {"application/json": {"schema": {"type": "object"}}},
            });
        }
        let entry = paths
            .entry(ep.path.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        entry[ep.method.to_ascii_lowercase()] = op;
    }
    json!({
        "openapi": "3.1.0",
        "info": {"title": API_TITLE, "version": API_VERSION},
        "servers": [{"url": "/"}],
        "paths": paths,
    })
}

/// Public base URL: the configured one (scheme added, trailing `/` removed),
/// else `http://<host>`.
pub fn base_url(configured: Option<&str>, host_header: Option<&str>) -> String {
    match configured.map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => {
            let url = if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("http://{}", url)
            };
            url.trim_end_matches('/').to_string()
        }
        None => format!("http://{}", host_header.unwrap_or("localhost")),
    }
}
