//! Stored records for day snapshots.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Grid, SnapshotId};
use crate::error::ScheduleError;

/// A saved copy of a day's grid, taken before a mutation.
///
/// Snapshots are immutable once inserted and are only removed by the
/// expiry sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Opaque identifier handed back to callers.
    pub id: SnapshotId,
    /// Day the grid belongs to.
    pub day: NaiveDate,
    /// Human description, e.g. `noCrew - Squad 42 (1900-2100)`.
    pub description: String,
    /// Audit string of the command that triggered the snapshot.
    pub command: String,
    /// Grid encoded as CSV.
    pub csv_data: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time after which the sweep may delete the snapshot.
    pub expires_at: DateTime<Utc>,
}

impl Snapshot {
    /// Captures `grid` with a fresh ID, expiring `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid cannot be encoded.
    pub fn capture(
        day: NaiveDate,
        grid: &Grid,
        description: impl Into<String>,
        command: impl Into<String>,
        ttl: Duration,
    ) -> Result<Self, ScheduleError> {
        let created_at = Utc::now();
        Ok(Self {
            id: SnapshotId::new(),
            day,
            description: description.into(),
            command: command.into(),
            csv_data: grid.to_csv()?,
            created_at,
            expires_at: created_at + ttl,
        })
    }

    /// Decodes the stored grid.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::GridParse`] if the CSV is corrupt.
    pub fn grid(&self) -> Result<Grid, ScheduleError> {
        Grid::from_csv(&self.csv_data)
    }

    /// Returns `true` if the snapshot has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Snapshot metadata without the grid payload, used for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    /// Snapshot identifier.
    pub id: SnapshotId,
    /// Day the grid belongs to.
    pub day: NaiveDate,
    /// Human description.
    pub description: String,
    /// Command audit string.
    pub command: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

impl From<&Snapshot> for SnapshotSummary {
    fn from(s: &Snapshot) -> Self {
        Self {
            id: s.id,
            day: s.day,
            description: s.description.clone(),
            command: s.command.clone(),
            created_at: s.created_at,
            expires_at: s.expires_at,
        }
    }
}
