//! Command request and response bodies.
//!
//! The same field set is accepted as a query string on the legacy `GET /`
//! surface and as a JSON body on `POST /api/v1/days/{date}/commands`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{CommandFields, Grid, SnapshotId, format_date};
use crate::persistence::SnapshotSummary;
use crate::service::CommandOutcome;

/// Loosely typed command fields, validated by [`CommandFields::parse`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CommandRequest {
    /// Action name or legacy alias, e.g. `remove-crew` or `noCrew`.
    #[serde(default)]
    pub action: Option<String>,
    /// Day in `YYYYMMDD` form. Taken from the path on the v1 surface.
    #[serde(default)]
    pub date: Option<String>,
    /// Start time, `HHMM`.
    #[serde(default)]
    pub shift_start: Option<String>,
    /// End time, `HHMM`.
    #[serde(default)]
    pub shift_end: Option<String>,
    /// Squad number.
    #[serde(default)]
    pub squad: Option<String>,
    /// Snapshot ID, for `revert`.
    #[serde(default, alias = "changeId")]
    pub change_id: Option<String>,
    /// Preview only. Defaults to `true`.
    #[serde(default)]
    pub preview: Option<bool>,
}

impl CommandRequest {
    /// Borrows the request as unvalidated command fields.
    #[must_use]
    pub fn fields(&self) -> CommandFields<'_> {
        CommandFields {
            action: self.action.as_deref(),
            date: self.date.as_deref(),
            shift_start: self.shift_start.as_deref(),
            shift_end: self.shift_end.as_deref(),
            squad: self.squad.as_deref(),
            change_id: self.change_id.as_deref(),
            preview: self.preview,
        }
    }
}

/// Successful command response.
///
/// Failures are rendered as [`crate::error::ErrorResponse`].
#[derive(Debug, Serialize, ToSchema)]
pub struct CommandResponse {
    /// Always `true`.
    pub success: bool,
    /// Canonical action name.
    pub action: String,
    /// Day in `YYYYMMDD` form.
    pub date: String,
    /// Current grid, or the unchanged grid for a preview.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<Grid>,
    /// Grid the command would produce, for a preview.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_grid: Option<Grid>,
    /// Snapshot taken before the change, or restored by a revert.
    #[serde(rename = "changeId", skip_serializing_if = "Option::is_none")]
    pub change_id: Option<SnapshotId>,
    /// Whether the command was only previewed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<bool>,
    /// Snapshots of the day, most recent first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<Vec<SnapshotDto>>,
}

impl From<CommandOutcome> for CommandResponse {
    fn from(outcome: CommandOutcome) -> Self {
        Self {
            success: true,
            action: outcome.action,
            date: format_date(outcome.date),
            grid: outcome.grid,
            modified_grid: outcome.modified_grid,
            change_id: outcome.change_id,
            preview: outcome.preview,
            snapshots: outcome
                .snapshots
                .map(|list| list.into_iter().map(SnapshotDto::from).collect()),
        }
    }
}

/// Snapshot metadata as listed to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SnapshotDto {
    /// Snapshot ID, usable as `change_id`.
    pub id: SnapshotId,
    /// Day in `YYYYMMDD` form.
    pub date: String,
    /// Human description of the change that triggered it.
    pub description: String,
    /// Audit string of that change.
    pub command: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

impl From<SnapshotSummary> for SnapshotDto {
    fn from(summary: SnapshotSummary) -> Self {
        Self {
            id: summary.id,
            date: format_date(summary.day),
            description: summary.description,
            command: summary.command,
            created_at: summary.created_at,
            expires_at: summary.expires_at,
        }
    }
}
