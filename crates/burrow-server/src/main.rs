//! Burrow server binary — per-tenant database provisioning over HTTP.
//!
//! Starts an axum HTTP server with structured logging, a tenant pool
//! registry, and graceful shutdown on SIGTERM/SIGINT. All retained tenant
//! pools are closed once the server stops accepting traffic.

use std::net::SocketAddr;
use std::sync::Arc;

use burrow_db::{DbRuntimeSettings, TenantRegistry};
use burrow_server::{app, config, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("BURROW_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Initialize the tenant registry. Pools are built lazily per tenant;
    // only the data directory has to exist up front.
    std::fs::create_dir_all(&config.database.data_dir)
        .expect("failed to create data directory — check database.data_dir in config");

    let registry = Arc::new(TenantRegistry::new(
        &config.database.data_dir,
        DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
            acquire_timeout_ms: config.database.acquire_timeout_ms,
        },
    ));

    // Build application
    let app = app(AppState {
        registry: Arc::clone(&registry),
    });
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, data_dir = %config.database.data_dir, "starting burrow server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // Traffic has stopped; release every tenant's connections.
    registry.shutdown_all();

    tracing::info!("burrow server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
