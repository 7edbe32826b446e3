//! # DevDash Redis Store
//!
//! File: cli/src/common/cache/remote.rs
//!
//! ## Overview
//!
//! `RedisStore` implements `KeyValueStore` on top of a multiplexed async Redis
//! connection. The connection is opened lazily on first use, bounded by the
//! configured connect timeout, and dropped again after any failed command so
//! the next call reconnects.
//!
use super::{KeyValueStore, StoreStats};
use crate::core::config::RedisConfig;
use crate::core::error::Result;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Upper bound for a single command once connected.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// `COUNT` hint per `SCAN` call.
const SCAN_PAGE: u64 = 50;

pub struct RedisStore {
    client: redis::Client,
    db: i64,
    connect_timeout: Duration,
    conn: Mutex<Option<MultiplexedConnection>>,
}

impl RedisStore {
    /// Builds the client; no network traffic happens until the first command.
    pub fn new(cfg: &RedisConfig) -> Result<Self> {
        let url = connection_url(cfg);
        let client = redis::Client::open(url.as_str())
            .with_context(|| format!("Invalid Redis address for host '{}'", cfg.effective_host()))?;
        Ok(Self {
            client,
            db: cfg.db,
            connect_timeout: Duration::from_millis(cfg.connect_timeout_ms),
            conn: Mutex::new(None),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        debug!("Opening Redis connection");
        let conn = tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| {
            anyhow!(
                "Redis connect timed out after {}ms",
                self.connect_timeout.as_millis()
            )
        })?
        .context("Redis connect failed")?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// Runs one operation, forgetting the connection if it fails.
    async fn with_conn<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let conn = self.connection().await?;
        let outcome = tokio::time::timeout(COMMAND_TIMEOUT, op(conn)).await;
        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                self.reset().await;
                Err(anyhow!(e).context("Redis command failed"))
            }
            Err(_) => {
                self.reset().await;
                Err(anyhow!("Redis command timed out"))
            }
        }
    }

    async fn reset(&self) {
        warn!("Dropping Redis connection after failure");
        *self.conn.lock().await = None;
    }
}

fn connection_url(cfg: &RedisConfig) -> String {
    let auth = match cfg.password.as_deref() {
        Some(pass) if !pass.is_empty() => format!(":{}@", pass),
        _ => String::new(),
    };
    format!(
        "redis://{}{}:{}/{}",
        auth,
        cfg.effective_host(),
        cfg.port,
        cfg.db
    )
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|mut c| async move { c.get::<_, Option<String>>(key).await })
            .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.with_conn(|mut c| async move { c.set_ex::<_, _, ()>(key, value, ttl_secs).await })
            .await
    }

    async fn ping(&self) -> Result<Duration> {
        let started = Instant::now();
        let pong: String = self
            .with_conn(|mut c| async move { redis::cmd("PING").query_async(&mut c).await })
            .await?;
        debug!("Redis answered {}", pong);
        Ok(started.elapsed())
    }

    async fn stats(&self, pattern: &str, sample: usize) -> Result<StoreStats> {
        let db = self.db;
        self.with_conn(|mut c| async move {
            let dbsize: i64 = redis::cmd("DBSIZE").query_async(&mut c).await?;
            let scan_conn = c.clone();
            let keys = scan_sample(sample, |cursor| {
                let mut conn = scan_conn.clone();
                async move {
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(SCAN_PAGE)
                        .query_async(&mut conn)
                        .await
                }
            })
            .await?;
            let info: String = redis::cmd("INFO").query_async(&mut c).await?;
            Ok(StoreStats {
                db,
                dbsize,
                keys,
                version: info_field(&info, "redis_version"),
                used_memory: info_field(&info, "used_memory_human"),
            })
        })
        .await
    }
}

/// Follows the `SCAN` cursor until `sample` keys are collected or the cursor
/// wraps back to 0. A single page may hold no matching keys on a large db.
async fn scan_sample<F, Fut>(sample: usize, mut page: F) -> redis::RedisResult<Vec<String>>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = redis::RedisResult<(u64, Vec<String>)>>,
{
    let mut keys = Vec::new();
    let mut cursor = 0;
    loop {
        let (next, batch) = page(cursor).await?;
        keys.extend(batch);
        if keys.len() >= sample || next == 0 {
            break;
        }
        cursor = next;
    }
    keys.truncate(sample);
    Ok(keys)
}

/// Extracts `field:value` from an INFO reply.
fn info_field(info: &str, field: &str) -> Option<String> {
    info.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        (k == field).then(|| v.trim().to_string())
    })
}
