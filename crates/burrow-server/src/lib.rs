//! Burrow server library logic.
//!
//! Burrow provisions one SQLite database per tenant over HTTP: a request
//! carrying a `tenant` header resolves (or lazily creates) that tenant's
//! connection pool and brings its schema up to date before responding.

pub mod api;
pub mod config;

use axum::{routing::get, Extension, Json, Router};
use burrow_db::TenantRegistry;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
pub struct AppState {
    /// Per-tenant connection pool registry.
    pub registry: Arc<TenantRegistry>,
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/provision", get(api::provision_handler))
        .layer(Extension(Arc::new(state)))
        .layer(TraceLayer::new_for_http())
}
