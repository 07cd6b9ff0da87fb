//! Command handlers: the legacy query surface and its v1 equivalent.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{CommandRequest, CommandResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, ScheduleError};

/// `GET /?action=...&date=...` — Run a command from query parameters.
///
/// Accepts the legacy action names (`noCrew`, `addShift`,
/// `obliterateShift`, `get_schedule_day`, `rollback`, `list_backups`)
/// alongside the canonical ones.
///
/// # Errors
///
/// Returns [`ScheduleError`] if validation or execution fails.
#[utoipa::path(
    get,
    path = "/",
    tag = "Commands",
    summary = "Run a command (query surface)",
    description = "Validates the query parameters into a command and runs it. Mutations are previewed unless `preview=false`.",
    params(CommandRequest),
    responses(
        (status = 200, description = "Command result", body = CommandResponse),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "Day or snapshot not found", body = ErrorResponse),
        (status = 422, description = "Unknown squad combination", body = ErrorResponse),
    )
)]
pub async fn query_command(
    State(state): State<AppState>,
    Query(req): Query<CommandRequest>,
) -> Result<impl IntoResponse, ScheduleError> {
    run(&state, &req).await
}

/// `POST /days/{date}/commands` — Run a command against one day.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidRequest`] if the body names a different
/// date than the path, plus any validation or execution error.
#[utoipa::path(
    post,
    path = "/api/v1/days/{date}/commands",
    tag = "Commands",
    summary = "Run a command",
    description = "Runs a segment mutation, get-current, revert or list-snapshots command for the day in the path.",
    params(("date" = String, Path, description = "Day in YYYYMMDD form")),
    request_body = CommandRequest,
    responses(
        (status = 200, description = "Command result", body = CommandResponse),
        (status = 400, description = "Invalid command", body = ErrorResponse),
        (status = 404, description = "Day or snapshot not found", body = ErrorResponse),
        (status = 422, description = "Unknown squad combination", body = ErrorResponse),
    )
)]
pub async fn post_command(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(mut req): Json<CommandRequest>,
) -> Result<impl IntoResponse, ScheduleError> {
    if let Some(body_date) = req.date.take().filter(|d| d.trim() != date) {
        return Err(ScheduleError::InvalidRequest(format!(
            "body date {body_date} does not match path date {date}"
        )));
    }
    req.date = Some(date);
    run(&state, &req).await
}

async fn run(state: &AppState, req: &CommandRequest) -> Result<Json<CommandResponse>, ScheduleError> {
    let command = req.fields().parse().inspect_err(|err| {
        tracing::warn!(
            action = ?req.action,
            date = ?req.date,
            code = err.error_code(),
            error = %err,
            "command rejected at validation"
        );
    })?;
    let outcome = state.schedule_service.execute(command).await?;
    Ok(Json(CommandResponse::from(outcome)))
}

/// Command routes nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/days/{date}/commands", post(post_command))
}

/// The query surface, mounted at the root.
pub fn legacy_routes() -> Router<AppState> {
    Router::new().route("/", get(query_command))
}
