//! Month generation from a CSV shift template.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{GenerateParams, GenerateResponse};
use crate::app_state::AppState;
use crate::domain::YearMonth;
use crate::error::{ErrorResponse, ScheduleError};

/// `POST /months/{month}/generate` — Populate a month from a template.
///
/// The body is the template CSV. Days that already have a grid are left
/// alone unless `overwrite=true`.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidRequest`] for a bad month or template,
/// plus any resolver or store error.
#[utoipa::path(
    post,
    path = "/api/v1/months/{month}/generate",
    tag = "Months",
    summary = "Generate a month",
    description = "Builds every day of the month from the rotating week template, derives territories and tango, and writes the grids.",
    params(
        ("month" = String, Path, description = "Month in YYYYMM form"),
        GenerateParams,
    ),
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Generation report", body = GenerateResponse),
        (status = 400, description = "Invalid month or template", body = ErrorResponse),
        (status = 422, description = "Unknown squad combination", body = ErrorResponse),
    )
)]
pub async fn generate_month(
    State(state): State<AppState>,
    Path(month): Path<String>,
    Query(params): Query<GenerateParams>,
    template: String,
) -> Result<impl IntoResponse, ScheduleError> {
    let month: YearMonth = month.parse()?;
    let report = state
        .schedule_service
        .generate_month(&template, month, params.overwrite)
        .await?;
    Ok(Json(GenerateResponse {
        success: true,
        report,
    }))
}

/// Month routes nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/months/{month}/generate", post(generate_month))
}
