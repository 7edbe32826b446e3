//! # DevDash Network Utilities Module (`common::network`)
//!
//! File: cli/src/common/network/mod.rs
//!
//! ## Overview
//!
//! Small reachability probes used by the service health endpoint:
//!
//! - `tcp_check`: can a TCP connection to `host:port` be opened within a timeout?
//! - `http_head`: does a URL answer a `HEAD` request at all? Any HTTP status
//!   counts as reachable; only transport errors and timeouts count as down.
//!
//! Both return a `Probe` with the measured latency instead of an error, because
//! an unreachable service is an expected answer, not a failure of devdash.
//!
//! ## Examples
//!
//! ```rust
//! let probe = network::tcp_check("ftxampp_mariadb", 3306, Duration::from_millis(250)).await;
//! if probe.ok {
//!     println!("mariadb up in {:?}ms", probe.latency_ms);
//! }
//! ```
//!
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::debug;

/// Outcome of one reachability probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Probe {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Probe {
    fn up(started: Instant) -> Self {
        Self {
            ok: true,
            latency_ms: Some(elapsed_ms(started)),
            error: None,
        }
    }

    fn down(error: String) -> Self {
        Self {
            ok: false,
            latency_ms: None,
            error: Some(error),
        }
    }
}

/// Milliseconds since `started`, rounded to one decimal.
pub fn elapsed_ms(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 10_000.0).round() / 10.0
}

/// Attempts a TCP connection to `host:port`.
///
/// ## Arguments
///
/// * `host` - Hostname or IP address (container names resolve via DNS)
/// * `port` - TCP port
/// * `timeout` - Upper bound for resolution plus connect
///
/// ## Returns
///
/// * `Probe` - `ok` with latency, or the connect error
pub async fn tcp_check(host: &str, port: u16, timeout: Duration) -> Probe {
    let started = Instant::now();
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => Probe::up(started),
        Ok(Err(e)) => {
            debug!("TCP check {}:{} failed: {}", host, port, e);
            Probe::down(e.to_string())
        }
        Err(_) => {
            debug!("TCP check {}:{} timed out", host, port);
            Probe::down(format!("timed out after {}ms", timeout.as_millis()))
        }
    }
}

/// Sends a `HEAD` request to `url`.
///
/// The latency is reported for failures too, matching what the dashboard
/// frontend displays for web services.
pub async fn http_head(client: &reqwest::Client, url: &str, timeout: Duration) -> Probe {
    let started = Instant::now();
    match client.head(url).timeout(timeout).send().await {
        Ok(resp) => {
            debug!("HEAD {} -> {}", url, resp.status());
            Probe::up(started)
        }
        Err(e) => {
            debug!("HEAD {} failed: {}", url, e);
            Probe {
                ok: false,
                latency_ms: Some(elapsed_ms(started)),
                error: Some(e.to_string()),
            }
        }
    }
}
