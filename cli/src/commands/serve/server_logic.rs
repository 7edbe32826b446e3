//! # DevDash HTTP Server Implementation
//!
//! File: cli/src/commands/serve/server_logic.rs
//!
//! ## Overview
//!
//! Runs the dashboard backend for `devdash serve`:
//! - JSON API under `/_dashboard/api`
//! - the built frontend under `/_dashboard/`, with a redirect from `/`
//! - port availability checking with automatic fallback
//! - CORS (permissive unless disabled) and request tracing
//! - graceful shutdown that also cancels running git/composer/npm processes
//!
//! ## Architecture
//!
//! 1. Build the `AppContext` (config, cache, process runner, shutdown token)
//! 2. Find an available port if the requested one is in use
//! 3. Build the router with `create_app`
//! 4. Serve until Ctrl+C or SIGTERM
//!
//! ## Examples
//!
//! ```rust
//! let config = config::load_and_merge_config(&args)?;
//! server_logic::run_server(config).await?;
//! ```
//!
use super::{api, frontend};
use crate::core::config::DashboardConfig;
use crate::core::context::AppContext;
use crate::core::error::Result;
use crate::dashboard::schema::API_PREFIX;
use anyhow::Context;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, warn, Level};

const MAX_PORT_ATTEMPTS: u8 = 10;

/// # Run HTTP Server (`run_server`)
///
/// Starts the dashboard server and blocks until shutdown.
///
/// ## Arguments
///
/// * `config`: The effective configuration (root, server settings, cache, ...)
///
/// ## Returns
///
/// * `Result<()>`: `Ok(())` after a graceful shutdown. Fails if no port is
///   free within the attempts, the cache backend cannot be set up, or the
///   listener cannot be bound.
pub async fn run_server(config: DashboardConfig) -> Result<()> {
    let ctx = AppContext::new(config)?;
    let settings = ctx.config.server.clone();
    let addr = find_available_port(settings.host, settings.port, MAX_PORT_ATTEMPTS).await?;

    let app = create_app(ctx.clone(), settings.enable_cors);

    println!("\n=================================================================");
    println!("📂 Document root:     {}", ctx.root().display());
    println!("🌐 Dashboard:         http://{}/_dashboard/", addr);
    println!("🔌 API:               http://{}{}/", addr, API_PREFIX);
    println!("🖼  Frontend build:    {}", ctx.config.frontend_dir().display());
    println!("🗄  Cache backend:     {}", ctx.cache.backend_name());
    println!("🔒 CORS enabled:      {}", settings.enable_cors);
    println!("=================================================================\n");

    info!("Starting server on {} for root {}", addr, ctx.root().display());
    println!("Server starting! Press Ctrl+C to stop.");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener to address {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(ctx.shutdown.clone()))
        .await
        .context("HTTP server failed")?;

    println!("\nServer shutdown complete.");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM and cancels `token`, which stops any external
/// process still running for a request.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown..."),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                info!("Received SIGTERM, initiating graceful shutdown...");
            }
            Err(e) => {
                error!(
                    "Failed to install SIGTERM handler: {}. Shutdown on SIGTERM might not work.",
                    e
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = token.cancelled() => {},
    }
    token.cancel();
}

/// # Find Available Port (`find_available_port`)
///
/// Tries `start_port` and up to `max_attempts - 1` following ports.
///
/// ## Returns
///
/// * `Result<SocketAddr>`: The first address that could be bound.
async fn find_available_port(
    req_host: std::net::IpAddr,
    start_port: u16,
    max_attempts: u8,
) -> Result<SocketAddr> {
    let mut current_port = start_port;

    for attempt in 0..max_attempts {
        let addr = SocketAddr::new(req_host, current_port);

        match TcpListener::bind(addr).await {
            Ok(listener) => {
                drop(listener);
                if attempt > 0 {
                    info!(
                        "Port {} was unavailable, successfully bound to available port {}.",
                        start_port, current_port
                    );
                }
                return Ok(addr);
            }
            Err(e) => {
                warn!(
                    "Attempt {}: Port {} on host {} is unavailable (Error: {}). Trying next port...",
                    attempt + 1,
                    current_port,
                    req_host,
                    e
                );
                match current_port.checked_add(1) {
                    Some(next) => current_port = next,
                    None => break,
                }
            }
        }
    }

    anyhow::bail!(
        "Could not find an available port on host {} starting from port {} after trying {} ports.",
        req_host,
        start_port,
        max_attempts
    )
}

/// # Create Axum Application (`create_app`)
///
/// The full router: API, frontend fallback, `/` redirect, tracing and CORS.
pub fn create_app(ctx: AppContext, enable_cors: bool) -> Router {
    let cors_layer = if enable_cors {
        info!("CORS middleware enabled (permissive).");
        CorsLayer::permissive()
    } else {
        info!("CORS middleware disabled.");
        CorsLayer::new()
    };

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::default().include_headers(true))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/", get(frontend::redirect_to_dashboard))
        .nest(API_PREFIX, api::router())
        .fallback(frontend::serve)
        .with_state(ctx)
        .layer(
            ServiceBuilder::new()
                .layer(trace_layer)
                .layer(cors_layer),
        )
}
