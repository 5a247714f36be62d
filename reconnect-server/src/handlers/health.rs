//! Health check handlers
//!
//! Provides health and readiness endpoints for monitoring and orchestration.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::AppState;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    #[schema(example = "healthy")]
    pub status: &'static str,
    /// Server version from Cargo.toml
    pub version: &'static str,
    /// Active storage backend
    #[schema(example = "postgres")]
    pub storage: &'static str,
    /// Service name
    pub service: &'static str,
}

/// GET /health - Health check endpoint
///
/// Returns JSON with service status, version, and the active storage
/// backend. Used for monitoring and load balancer health checks.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service health", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let storage = if state.config.database_url.is_some() {
        "postgres"
    } else {
        "memory"
    };

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        storage,
        service: "reconnect-server",
    })
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
    /// Optional message explaining status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// GET /ready - Readiness probe
///
/// Exercises the storage backend with a cheap lookup; returns 503 until
/// storage answers.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready", body = ReadyResponse),
        (status = 503, description = "Storage not reachable", body = ReadyResponse),
    )
)]
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    match state.store.find_by_id(Uuid::nil()).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                message: Some(e.to_string()),
            }),
        ),
    }
}
