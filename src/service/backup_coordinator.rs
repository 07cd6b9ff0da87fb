//! Snapshot save/revert/list/expire behind a single on/off switch.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};

use crate::domain::{Grid, SnapshotId};
use crate::error::ScheduleError;
use crate::persistence::{Snapshot, SnapshotStore, SnapshotSummary};

/// Coordinates snapshots of day grids.
///
/// When [`BackupCoordinator::Disabled`], saves are skipped (`None`),
/// listings are empty and reverts fail with
/// [`ScheduleError::BackupUnavailable`].
#[derive(Debug, Clone)]
pub enum BackupCoordinator {
    /// Snapshots go to a durable store.
    Enabled {
        /// Snapshot store.
        store: Arc<dyn SnapshotStore>,
        /// Lifetime of new snapshots.
        default_ttl: Duration,
    },
    /// No snapshot store is configured or backups are switched off.
    Disabled,
}

impl BackupCoordinator {
    /// Creates an enabled coordinator.
    #[must_use]
    pub fn enabled(store: Arc<dyn SnapshotStore>, default_ttl: Duration) -> Self {
        Self::Enabled { store, default_ttl }
    }

    /// Returns `true` if snapshots are being recorded.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }

    /// Saves `grid` as the state of `day` before a change, using the
    /// default lifetime.
    ///
    /// # Errors
    ///
    /// Propagates snapshot store failures.
    pub async fn save(
        &self,
        day: NaiveDate,
        grid: &Grid,
        description: &str,
        command: &str,
    ) -> Result<Option<SnapshotId>, ScheduleError> {
        match self {
            Self::Enabled { default_ttl, .. } => {
                self.save_with_ttl(day, grid, description, command, *default_ttl)
                    .await
            }
            Self::Disabled => Ok(None),
        }
    }

    /// Saves `grid` with an explicit lifetime.
    ///
    /// # Errors
    ///
    /// Propagates snapshot store failures.
    pub async fn save_with_ttl(
        &self,
        day: NaiveDate,
        grid: &Grid,
        description: &str,
        command: &str,
        ttl: Duration,
    ) -> Result<Option<SnapshotId>, ScheduleError> {
        let Self::Enabled { store, .. } = self else {
            return Ok(None);
        };
        let snapshot = Snapshot::capture(day, grid, description, command, ttl)?;
        store.insert(&snapshot).await?;
        tracing::info!(snapshot_id = %snapshot.id, %day, description, "snapshot saved");
        Ok(Some(snapshot.id))
    }

    /// Returns the snapshot with ID `id`, ready to be written back.
    ///
    /// Snapshots are never created or deleted by a revert, so reverting
    /// the same ID twice yields the same grid.
    ///
    /// # Errors
    ///
    /// - [`ScheduleError::BackupUnavailable`] when disabled.
    /// - [`ScheduleError::SnapshotNotFound`] if no such snapshot exists.
    /// - [`ScheduleError::GridParse`] if the stored CSV is corrupt.
    pub async fn revert(&self, id: SnapshotId) -> Result<(Snapshot, Grid), ScheduleError> {
        let Self::Enabled { store, .. } = self else {
            return Err(ScheduleError::BackupUnavailable);
        };
        let snapshot = store
            .fetch(id)
            .await?
            .ok_or(ScheduleError::SnapshotNotFound(id))?;
        let grid = snapshot.grid()?;
        Ok((snapshot, grid))
    }

    /// Lists the snapshots of `day`, most recent first.
    ///
    /// # Errors
    ///
    /// Propagates snapshot store failures.
    pub async fn list(&self, day: NaiveDate) -> Result<Vec<SnapshotSummary>, ScheduleError> {
        match self {
            Self::Enabled { store, .. } => store.list(day).await,
            Self::Disabled => Ok(Vec::new()),
        }
    }

    /// Deletes expired snapshots and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Propagates snapshot store failures.
    pub async fn expire(&self) -> Result<u64, ScheduleError> {
        let Self::Enabled { store, .. } = self else {
            return Ok(0);
        };
        let deleted = store.delete_expired(Utc::now()).await?;
        if deleted > 0 {
            tracing::info!(deleted, "expired snapshots removed");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::MemorySnapshotStore;

    fn day() -> NaiveDate {
        let Some(date) = NaiveDate::from_ymd_opt(2026, 1, 5) else {
            panic!("valid date");
        };
        date
    }

    fn enabled() -> BackupCoordinator {
        BackupCoordinator::enabled(Arc::new(MemorySnapshotStore::new()), Duration::days(30))
    }

    #[tokio::test]
    async fn disabled_mode_is_inert() {
        let backups = BackupCoordinator::Disabled;
        assert!(!backups.is_enabled());
        assert!(matches!(
            backups.save(day(), &Grid::default(), "d", "c").await,
            Ok(None)
        ));
        assert!(matches!(backups.list(day()).await, Ok(v) if v.is_empty()));
        assert!(matches!(backups.expire().await, Ok(0)));
        assert!(matches!(
            backups.revert(SnapshotId::new()).await,
            Err(ScheduleError::BackupUnavailable)
        ));
    }

    #[tokio::test]
    async fn revert_returns_saved_grid_and_keeps_snapshot() {
        let backups = enabled();
        let grid = Grid::default();
        let Ok(Some(id)) = backups.save(day(), &grid, "before", "action=test").await else {
            panic!("save should return an id");
        };

        let Ok((first, restored)) = backups.revert(id).await else {
            panic!("revert should succeed");
        };
        assert_eq!(restored, grid);
        assert_eq!(first.description, "before");

        let Ok((_, again)) = backups.revert(id).await else {
            panic!("second revert should succeed");
        };
        assert_eq!(again, restored);
        assert!(matches!(backups.list(day()).await, Ok(v) if v.len() == 1));
    }

    #[tokio::test]
    async fn unknown_snapshot_is_not_found() {
        assert!(matches!(
            enabled().revert(SnapshotId::new()).await,
            Err(ScheduleError::SnapshotNotFound(_))
        ));
    }

    #[tokio::test]
    async fn expire_uses_snapshot_ttl() {
        let backups = enabled();
        let grid = Grid::default();
        let (Ok(_), Ok(_)) = (
            backups
                .save_with_ttl(day(), &grid, "old", "c", Duration::seconds(-1))
                .await,
            backups.save(day(), &grid, "new", "c").await,
        ) else {
            panic!("saves should succeed");
        };
        assert!(matches!(backups.expire().await, Ok(1)));
        assert!(matches!(backups.list(day()).await, Ok(v) if v.len() == 1));
    }
}
