//! API handlers for the burrow server.

use crate::AppState;
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use burrow_db::{apply_pending, TenantId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Response body for a successful provision call.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProvisionResponse {
    /// The tenant that was provisioned.
    pub tenant: String,
    /// Path of the tenant's database file.
    pub database: String,
    /// Number of migration steps applied by this request. Zero for an
    /// already-current tenant.
    #[serde(rename = "migrationsApplied")]
    pub migrations_applied: usize,
}

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Handler for `GET /api/provision`.
///
/// The tenant key arrives in the `tenant` header. Validation happens
/// before anything else: a missing, empty, or malformed key is rejected
/// with 400 and the registry is never touched. For a valid key, the
/// tenant's pool is resolved (built on first access) and pending schema
/// migrations are applied before the response is sent.
pub async fn provision_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ProvisionResponse>, ApiError> {
    let raw = headers
        .get("tenant")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let tenant =
        TenantId::parse(raw).map_err(|e| ApiError::BadRequest(format!("no usable tenant: {e}")))?;

    let response = tokio::task::spawn_blocking(move || {
        let pool = state
            .registry
            .resolve(&tenant)
            .map_err(|e| ApiError::InternalServerError(e.to_string()))?;

        let migrations_applied = apply_pending(&pool, &tenant)
            .map_err(|e| ApiError::InternalServerError(e.to_string()))?;

        Ok(ProvisionResponse {
            database: state.registry.db_path(&tenant).display().to_string(),
            tenant: tenant.as_str().to_string(),
            migrations_applied,
        })
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(response))
}
