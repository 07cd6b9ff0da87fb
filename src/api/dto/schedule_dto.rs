//! Whole-day, month and maintenance DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{DaySchedule, SquadId, TerritoryId};
use crate::service::MonthReport;

/// Request body for `POST /days/{date}/apply`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ApplyRequest {
    /// Replacement schedule for the whole day.
    pub schedule: DaySchedule,
    /// Preview only. Defaults to `true`.
    #[serde(default)]
    pub preview: Option<bool>,
}

/// Query parameters for `POST /months/{month}/generate`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GenerateParams {
    /// Replace days that already have a grid, snapshotting each first.
    #[serde(default)]
    pub overwrite: bool,
}

/// Response body for month generation.
#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateResponse {
    /// Always `true`.
    pub success: bool,
    /// What was written.
    #[serde(flatten)]
    pub report: MonthReport,
}

/// Response body for `POST /snapshots/expire`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ExpireResponse {
    /// Always `true`.
    pub success: bool,
    /// Number of snapshots deleted.
    pub deleted: u64,
}

/// Response body for `GET /config/roster`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RosterResponse {
    /// Squads the station schedules, ascending.
    pub squads: Vec<SquadId>,
    /// Territories the squads cover, ascending.
    pub territories: Vec<TerritoryId>,
    /// Whether snapshots are being recorded.
    pub backups_enabled: bool,
}
