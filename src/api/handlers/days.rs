//! Day handlers: read the current grid, replace a whole day.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{ApplyRequest, CommandResponse};
use crate::app_state::AppState;
use crate::domain::{Command, parse_date};
use crate::error::{ErrorResponse, ScheduleError};

/// `GET /days/{date}` — Current grid of a day.
///
/// # Errors
///
/// Returns [`ScheduleError::DayNotFound`] if the day has no grid.
#[utoipa::path(
    get,
    path = "/api/v1/days/{date}",
    tag = "Days",
    summary = "Get a day's grid",
    description = "Returns the stored 10x4 grid of the day.",
    params(("date" = String, Path, description = "Day in YYYYMMDD form")),
    responses(
        (status = 200, description = "Current grid", body = CommandResponse),
        (status = 400, description = "Invalid date", body = ErrorResponse),
        (status = 404, description = "Day not found", body = ErrorResponse),
    )
)]
pub async fn get_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, ScheduleError> {
    let date = parse_date(&date)?;
    let outcome = state
        .schedule_service
        .execute(Command::GetCurrent { date })
        .await?;
    Ok(Json(CommandResponse::from(outcome)))
}

/// `POST /days/{date}/apply` — Replace a whole day.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidRequest`] for a schedule of another day
/// or with overlapping shifts, plus any resolver or store error.
#[utoipa::path(
    post,
    path = "/api/v1/days/{date}/apply",
    tag = "Days",
    summary = "Apply an external schedule",
    description = "Normalizes the supplied schedule, re-derives territories and tango, and writes it as the day's grid. The previous grid is snapshotted. Previewed unless `preview` is false.",
    params(("date" = String, Path, description = "Day in YYYYMMDD form")),
    request_body = ApplyRequest,
    responses(
        (status = 200, description = "Applied or previewed grid", body = CommandResponse),
        (status = 400, description = "Invalid schedule", body = ErrorResponse),
        (status = 422, description = "Unknown squad combination", body = ErrorResponse),
    )
)]
pub async fn apply_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(req): Json<ApplyRequest>,
) -> Result<impl IntoResponse, ScheduleError> {
    let date = parse_date(&date)?;
    let outcome = state
        .schedule_service
        .apply_external(date, req.schedule, req.preview.unwrap_or(true))
        .await?;
    Ok(Json(CommandResponse::from(outcome)))
}

/// Day routes nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/days/{date}", get(get_day))
        .route("/days/{date}/apply", post(apply_day))
}
