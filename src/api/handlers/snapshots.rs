//! Snapshot handlers: list, revert, expire.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{CommandResponse, ExpireResponse};
use crate::app_state::AppState;
use crate::domain::{Command, SnapshotId, parse_date};
use crate::error::{ErrorResponse, ScheduleError};

/// `GET /days/{date}/snapshots` — Snapshots of a day, most recent first.
///
/// Empty when backups are disabled.
///
/// # Errors
///
/// Returns [`ScheduleError`] on an invalid date or store failure.
#[utoipa::path(
    get,
    path = "/api/v1/days/{date}/snapshots",
    tag = "Snapshots",
    summary = "List snapshots",
    params(("date" = String, Path, description = "Day in YYYYMMDD form")),
    responses(
        (status = 200, description = "Snapshot listing", body = CommandResponse),
        (status = 400, description = "Invalid date", body = ErrorResponse),
    )
)]
pub async fn list_snapshots(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, ScheduleError> {
    let date = parse_date(&date)?;
    let outcome = state
        .schedule_service
        .execute(Command::ListSnapshots { date })
        .await?;
    Ok(Json(CommandResponse::from(outcome)))
}

/// `POST /days/{date}/revert/{id}` — Restore a day from a snapshot.
///
/// # Errors
///
/// - [`ScheduleError::BackupUnavailable`] when backups are disabled.
/// - [`ScheduleError::SnapshotNotFound`] for an unknown snapshot.
/// - [`ScheduleError::InvalidRequest`] for a snapshot of another day.
#[utoipa::path(
    post,
    path = "/api/v1/days/{date}/revert/{id}",
    tag = "Snapshots",
    summary = "Revert a day",
    description = "Writes the snapshot's grid back exactly as saved. Reverting the same snapshot twice gives the same grid.",
    params(
        ("date" = String, Path, description = "Day in YYYYMMDD form"),
        ("id" = SnapshotId, Path, description = "Snapshot ID"),
    ),
    responses(
        (status = 200, description = "Restored grid", body = CommandResponse),
        (status = 404, description = "Snapshot not found", body = ErrorResponse),
        (status = 409, description = "Backups disabled", body = ErrorResponse),
    )
)]
pub async fn revert_day(
    State(state): State<AppState>,
    Path((date, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ScheduleError> {
    let date = parse_date(&date)?;
    let snapshot = id
        .parse::<SnapshotId>()
        .map_err(|_| ScheduleError::InvalidRequest(format!("invalid snapshot id {id:?}")))?;
    let outcome = state
        .schedule_service
        .execute(Command::Revert { date, snapshot })
        .await?;
    Ok(Json(CommandResponse::from(outcome)))
}

/// `POST /snapshots/expire` — Run the expiry sweep now.
///
/// # Errors
///
/// Returns [`ScheduleError`] on store failure.
#[utoipa::path(
    post,
    path = "/api/v1/snapshots/expire",
    tag = "Snapshots",
    summary = "Delete expired snapshots",
    responses(
        (status = 200, description = "Sweep result", body = ExpireResponse),
    )
)]
pub async fn expire_snapshots(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ScheduleError> {
    let deleted = state.schedule_service.expire_snapshots().await?;
    Ok(Json(ExpireResponse {
        success: true,
        deleted,
    }))
}

/// Snapshot routes nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/days/{date}/snapshots", get(list_snapshots))
        .route("/days/{date}/revert/{id}", post(revert_day))
        .route("/snapshots/expire", post(expire_snapshots))
}
