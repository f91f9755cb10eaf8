//! System endpoints: health check and session status.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::broadcast::BroadcastStats;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// Session status response.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    /// Name the service is advertised under.
    advertised_as: String,
    /// Sessions currently receiving updates.
    active_connections: usize,
    /// Whether new sessions are accepted.
    accepting: bool,
    /// Seconds between updates on a session.
    emit_interval_secs: u64,
    /// Seconds since the server started.
    uptime_secs: u64,
    /// Lifetime counters.
    stats: BroadcastStats,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /status` — Live session count and broadcaster counters.
#[utoipa::path(
    get,
    path = "/status",
    tag = "System",
    summary = "Session status",
    description = "Returns the advertised name, active WebSocket sessions and lifetime counters.",
    responses(
        (status = 200, description = "Current status", body = StatusResponse),
    )
)]
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let broadcaster = &state.broadcaster;
    (
        StatusCode::OK,
        Json(StatusResponse {
            advertised_as: state.advertised_as.to_string(),
            active_connections: broadcaster.active_connections(),
            accepting: broadcaster.is_accepting(),
            emit_interval_secs: broadcaster.period().as_secs(),
            uptime_secs: state.started_at.elapsed().as_secs(),
            stats: broadcaster.stats(),
        }),
    )
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
}
