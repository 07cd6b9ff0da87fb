//! System endpoints: health check, roster.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::dto::RosterResponse;
use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
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

/// `GET /config/roster` — Squads and territories the station schedules.
#[utoipa::path(
    get,
    path = "/config/roster",
    tag = "System",
    summary = "Station roster",
    description = "Returns the rostered squads, the territories of the coverage table, and whether snapshots are recorded.",
    responses(
        (status = 200, description = "Roster", body = RosterResponse),
    )
)]
pub async fn roster_handler(State(state): State<AppState>) -> impl IntoResponse {
    let service = &state.schedule_service;
    let table = service.engine().resolver().table();
    (
        StatusCode::OK,
        Json(RosterResponse {
            squads: table.roster(),
            territories: table.territories(),
            backups_enabled: service.backups().is_enabled(),
        }),
    )
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/roster", get(roster_handler))
}
