//! # DevDash Service Health
//!
//! File: cli/src/dashboard/health.rs
//!
//! ## Overview
//!
//! Backs the three diagnostic endpoints of the dashboard:
//!
//! - **services**: TCP reachability of the configured targets (database, web
//!   server, Redis), optionally followed by `HEAD` checks of the URLs listed in
//!   `services.json`.
//! - **ping**: the Redis environment as devdash sees it (password masked) and
//!   a `PING` round trip.
//! - **store debug**: key count, a sample of `ftx:` keys, server version and
//!   memory use.
//!
//! Unreachable services are reported in the payload, never as request errors.
//!
//! ## Architecture
//!
//! TCP checks run concurrently on a `JoinSet` and are re-sorted by name.
//! The Redis checks use the cache's remote store when one is configured; with
//! the file backend a short-lived `RedisStore` is built from the same settings,
//! so the endpoints still tell whether Redis would be reachable.
//!
use crate::common::cache::remote::RedisStore;
use crate::common::cache::KeyValueStore;
use crate::common::network::{self, Probe};
use crate::core::config::{RedisConfig, ServiceTarget};
use crate::core::context::AppContext;
use crate::core::error::Result;
use crate::dashboard::metadata::KEY_PREFIX;
use anyhow::Context;
use serde::Serialize;
use serde_json::{json, Value};
use std::env;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Keys returned by the store debug endpoint.
const KEY_SAMPLE: usize = 10;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ServiceCheck {
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(flatten)]
    pub probe: Probe,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WebCheck {
    pub name: String,
    pub url: String,
    #[serde(flatten)]
    pub probe: Probe,
    pub tags: Value,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ServicesReport {
    pub env: Value,
    pub services: Vec<ServiceCheck>,
    pub web: Vec<WebCheck>,
}

impl ServicesReport {
    pub fn meta(&self) -> Value {
        json!({
            "count": self.services.len(),
            "http_count": self.web.len(),
            "timestamp": chrono::Local::now().to_rfc3339(),
        })
    }
}

fn env_or_empty(key: &str) -> String {
    env::var(key).unwrap_or_default()
}

/// Versions of the surrounding stack, as exported to the dashboard.
fn stack_env() -> Value {
    json!({
        "MARIADB_VERSION": env_or_empty("MARIADB_VERSION"),
        "REDIS_VERSION": env_or_empty("REDIS_VERSION"),
        "DEVDASH_VERSION": env!("CARGO_PKG_VERSION"),
    })
}

/// TCP-checks every target concurrently; results sorted by name.
pub async fn check_targets(targets: &[ServiceTarget], timeout: Duration) -> Vec<ServiceCheck> {
    let mut tasks = JoinSet::new();
    for target in targets.iter().cloned() {
        tasks.spawn(async move {
            let probe = network::tcp_check(&target.host, target.port, timeout).await;
            ServiceCheck {
                name: target.name,
                host: target.host,
                port: target.port,
                probe,
            }
        });
    }
    let mut checks = Vec::with_capacity(targets.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(check) => checks.push(check),
            Err(e) => warn!("Service check task failed: {}", e),
        }
    }
    checks.sort_by(|a, b| a.name.cmp(&b.name));
    checks
}

/// Reads `[{name, url, tags}]`; a missing or malformed file is an empty list.
pub fn load_http_services(path: &std::path::Path) -> Vec<(String, String, Value)> {
    let Ok(raw) = fs::read_to_string(path) else {
        debug!("No HTTP service list at {:?}", path);
        return Vec::new();
    };
    let list = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(list)) => list,
        Ok(_) | Err(_) => {
            warn!("Ignoring malformed service list {:?}", path);
            return Vec::new();
        }
    };
    list.iter()
        .filter_map(|svc| {
            let url = svc.get("url").and_then(Value::as_str).unwrap_or_default();
            if url.is_empty() {
                return None;
            }
            let name = svc
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("service")
                .to_string();
            let tags = svc.get("tags").cloned().unwrap_or_else(|| json!([]));
            Some((name, url.to_string(), tags))
        })
        .collect()
}

/// Runs the services checks.
///
/// ## Arguments
///
/// * `ctx` - Application context (targets, timeouts, services.json location)
/// * `with_http` - Also `HEAD` the URLs from `services.json`
pub async fn services(ctx: &AppContext, with_http: bool) -> Result<ServicesReport> {
    let cfg = &ctx.config.services;
    let services = check_targets(&cfg.targets, Duration::from_millis(cfg.tcp_timeout_ms)).await;

    let mut web = Vec::new();
    if with_http {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        let timeout = Duration::from_millis(cfg.http_timeout_ms);
        for (name, url, tags) in load_http_services(&ctx.config.services_http_config()) {
            let probe = network::http_head(&client, &url, timeout).await;
            web.push(WebCheck {
                name,
                url,
                probe,
                tags,
            });
        }
    }

    Ok(ServicesReport {
        env: stack_env(),
        services,
        web,
    })
}

/// The remote store used for diagnostics.
fn diagnostic_store(ctx: &AppContext) -> Result<Arc<dyn KeyValueStore>> {
    match ctx.cache.remote() {
        Some(remote) => Ok(remote.clone()),
        None => Ok(Arc::new(RedisStore::new(&ctx.config.cache.redis)?)),
    }
}

fn redis_env(cfg: &RedisConfig) -> Value {
    let password = match cfg.password.as_deref() {
        Some(p) if !p.is_empty() => "*** set ***",
        _ => "(empty)",
    };
    json!({
        "REDIS_HOST": cfg.host.clone().unwrap_or_default(),
        "REDIS_PORT": cfg.port.to_string(),
        "REDIS_PASSWORD": password,
        "DEVDASH_VERSION": env!("CARGO_PKG_VERSION"),
    })
}

/// Environment summary plus a `PING` round trip.
pub async fn ping(ctx: &AppContext) -> Value {
    let env = redis_env(&ctx.config.cache.redis);
    let store = match diagnostic_store(ctx) {
        Ok(store) => store,
        Err(e) => {
            return json!({
                "env": env,
                "redis": {"connected": false, "error": format!("{:#}", e)},
            })
        }
    };
    let redis = match store.ping().await {
        Ok(latency) => json!({
            "connected": true,
            "ping": true,
            "latency_ms": (latency.as_secs_f64() * 10_000.0).round() / 10.0,
        }),
        Err(e) => json!({"connected": false, "error": format!("{:#}", e)}),
    };
    json!({"env": env, "redis": redis})
}

/// Key statistics for the `ftx:` namespace.
pub async fn store_debug(ctx: &AppContext) -> Value {
    let pattern = format!("{}*", KEY_PREFIX);
    let stats = match diagnostic_store(ctx) {
        Ok(store) => store.stats(&pattern, KEY_SAMPLE).await,
        Err(e) => Err(e),
    };
    match stats {
        Ok(stats) => json!({
            "connected": true,
            "db": stats.db,
            "keys": stats.dbsize,
            "prefix": KEY_PREFIX,
            "sample": stats.keys,
            "info": {
                "redis_version": stats.version,
                "used_memory_human": stats.used_memory,
            },
        }),
        Err(e) => json!({
            "connected": false,
            "db": Value::Null,
            "keys": 0,
            "prefix": KEY_PREFIX,
            "sample": [],
            "info": {"redis_version": Value::Null, "used_memory_human": Value::Null},
            "error": format!("{:#}", e),
        }),
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::cache::tests::MemoryStore;
    use crate::common::cache::file::FileCache;
    use crate::common::cache::Cache;
    use crate::core::context::tests::test_context;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::tempdir;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_check_targets_sorted_and_probed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let closed = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };
        let targets = vec![
            ServiceTarget { name: "web".into(), host: "127.0.0.1".into(), port: closed },
            ServiceTarget { name: "db".into(), host: "127.0.0.1".into(), port: open },
        ];
        let checks = check_targets(&targets, Duration::from_millis(500)).await;
        assert_eq!(checks[0].name, "db");
        assert!(checks[0].probe.ok);
        assert_eq!(checks[1].name, "web");
        assert!(!checks[1].probe.ok);

        let json = serde_json::to_value(&checks[0]).unwrap();
        assert_eq!(json["port"], open);
        assert_eq!(json["ok"], true);
        assert!(json["latency_ms"].is_number());
    }

    #[test]
    fn test_load_http_services_skips_empty_urls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("services.json");
        assert!(load_http_services(&path).is_empty());
        fs::write(
            &path,
            r#"[{"name":"adminer","url":"http://localhost:8080","tags":["db"]},{"name":"x","url":""},{"url":"http://mail:8025"}]"#,
        )
        .unwrap();
        let list = load_http_services(&path);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], ("adminer".into(), "http://localhost:8080".into(), json!(["db"])));
        assert_eq!(list[1].0, "service");
        assert_eq!(list[1].2, json!([]));
        fs::write(&path, "{}").unwrap();
        assert!(load_http_services(&path).is_empty());
    }

    #[tokio::test]
    async fn test_services_report_meta() {
        let root = tempdir().unwrap();
        let cache = tempdir().unwrap();
        let mut ctx = test_context(root.path(), cache.path());
        let mut config = (*ctx.config).clone();
        config.services.targets.clear();
        ctx.config = Arc::new(config);
        let report = services(&ctx, true).await.unwrap();
        assert!(report.services.is_empty());
        assert!(report.web.is_empty());
        let meta = report.meta();
        assert_eq!(meta["count"], 0);
        assert_eq!(meta["http_count"], 0);
        assert!(meta["timestamp"].is_string());
        assert!(report.env.get("MARIADB_VERSION").is_some());
    }

    #[test]
    fn test_redis_env_masks_password() {
        let mut cfg = RedisConfig::default();
        assert_eq!(redis_env(&cfg)["REDIS_PASSWORD"], "(empty)");
        cfg.password = Some("hunter2".into());
        let env = redis_env(&cfg);
        assert_eq!(env["REDIS_PASSWORD"], "*** set ***");
        assert!(!env.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_ping_and_debug_with_memory_store() {
        let root = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        let store = MemoryStore {
            entries: Mutex::new(HashMap::new()),
            failing: false,
        };
        let mut ctx = test_context(root.path(), cache_dir.path());
        ctx.cache = Cache::new(Some(Arc::new(store)), FileCache::new(cache_dir.path()));
        let pong = ping(&ctx).await;
        assert_eq!(pong["redis"]["connected"], true);
        let debug = store_debug(&ctx).await;
        assert_eq!(debug["connected"], true);
        assert_eq!(debug["prefix"], "ftx:");
    }

    #[tokio::test]
    async fn test_unreachable_store_is_reported() {
        let root = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        let mut ctx = test_context(root.path(), cache_dir.path());
        let mut config = (*ctx.config).clone();
        config.cache.redis.host = Some("127.0.0.1".into());
        config.cache.redis.port = 1;
        config.cache.redis.connect_timeout_ms = 300;
        ctx.config = Arc::new(config);
        let pong = ping(&ctx).await;
        assert_eq!(pong["redis"]["connected"], false);
        assert!(pong["redis"]["error"].is_string());
        let debug = store_debug(&ctx).await;
        assert_eq!(debug["connected"], false);
        assert_eq!(debug["keys"], 0);
    }
}
