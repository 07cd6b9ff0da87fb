//! Schedule error types with HTTP status code mapping.
//!
//! [`ScheduleError`] is the central error type for the crate. Core errors
//! (range, combination, grid, snapshot) are structural and never retried;
//! only [`ScheduleError::TransientStore`] is worth retrying, and that is the
//! caller's decision.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::SnapshotId;

/// Failure body returned by every command endpoint.
///
/// ```json
/// { "success": false, "error": "invalid range: start equals end", "code": 1001 }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Human-readable error message.
    pub error: String,
    /// Numeric error code.
    pub code: u32,
}

/// Error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category             | HTTP Status                  |
/// |-----------|----------------------|------------------------------|
/// | 1000–1999 | Validation           | 400 Bad Request              |
/// | 2000–2999 | Not Found / Conflict | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Store / Server       | 500 / 503                    |
/// | 4000–4999 | Schedule structure   | 422 Unprocessable Entity     |
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// Command range is empty or names a squad outside the roster.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// No schedule exists for the target day.
    #[error("day not found: {0}")]
    DayNotFound(NaiveDate),

    /// The territory tables have no entry for this squad combination.
    #[error("unknown squad combination: {0}")]
    UnknownCombination(String),

    /// The day does not fit the 10x4 grid.
    #[error("grid overflow: {0}")]
    GridOverflow(String),

    /// A grid cell could not be parsed.
    #[error("grid parse error: {0}")]
    GridParse(String),

    /// No snapshot with the given ID exists.
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(SnapshotId),

    /// Backups are disabled for this deployment.
    #[error("backups unavailable: no durable snapshot store is configured")]
    BackupUnavailable,

    /// Retryable failure reported by a backing store.
    #[error("transient store error: {0}")]
    TransientStore(String),

    /// Request validation failed at the command boundary.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Non-retryable backing store failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ScheduleError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRange(_) => 1001,
            Self::InvalidRequest(_) => 1002,
            Self::DayNotFound(_) => 2001,
            Self::SnapshotNotFound(_) => 2002,
            Self::BackupUnavailable => 2003,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::TransientStore(_) => 3002,
            Self::UnknownCombination(_) => 4001,
            Self::GridOverflow(_) => 4002,
            Self::GridParse(_) => 4003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRange(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::DayNotFound(_) | Self::SnapshotNotFound(_) => StatusCode::NOT_FOUND,
            Self::BackupUnavailable => StatusCode::CONFLICT,
            Self::UnknownCombination(_) | Self::GridOverflow(_) | Self::GridParse(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::TransientStore(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` if retrying the same call may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransientStore(_))
    }
}

impl From<sqlx::Error> for ScheduleError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::TransientStore(err.to_string())
            }
            other => Self::Persistence(other.to_string()),
        }
    }
}

impl From<csv::Error> for ScheduleError {
    fn from(err: csv::Error) -> Self {
        Self::GridParse(err.to_string())
    }
}

impl IntoResponse for ScheduleError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: self.error_code(),
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn codes_fall_in_documented_ranges() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap_or_default();
        assert_eq!(ScheduleError::InvalidRange("x".into()).error_code(), 1001);
        assert_eq!(ScheduleError::DayNotFound(day).error_code(), 2001);
        assert_eq!(ScheduleError::BackupUnavailable.error_code(), 2003);
        assert_eq!(ScheduleError::GridParse("x".into()).error_code(), 4003);
    }

    #[test]
    fn only_transient_store_is_retryable() {
        assert!(ScheduleError::TransientStore("timeout".into()).is_transient());
        assert!(!ScheduleError::Persistence("constraint".into()).is_transient());
        assert!(!ScheduleError::BackupUnavailable.is_transient());
    }

    #[test]
    fn pool_timeout_maps_to_transient() {
        let err: ScheduleError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_transient());
        let err: ScheduleError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ScheduleError::Persistence(_)));
    }

    #[test]
    fn response_status_matches_variant() {
        let response = ScheduleError::UnknownCombination("34,99".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let response = ScheduleError::BackupUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
