//! In-memory stores backed by `tokio::sync::RwLock` maps.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use super::models::{Snapshot, SnapshotSummary};
use super::{GridStore, SnapshotStore};
use crate::domain::{Grid, SnapshotId};
use crate::error::ScheduleError;

/// Day grids held in process memory. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryGridStore {
    days: RwLock<HashMap<NaiveDate, Grid>>,
}

impl MemoryGridStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GridStore for MemoryGridStore {
    async fn get_day(&self, day: NaiveDate) -> Result<Option<Grid>, ScheduleError> {
        Ok(self.days.read().await.get(&day).cloned())
    }

    async fn put_day(&self, day: NaiveDate, grid: &Grid) -> Result<(), ScheduleError> {
        self.days.write().await.insert(day, grid.clone());
        Ok(())
    }
}

/// Snapshots held in process memory.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<HashMap<SnapshotId, Snapshot>>,
}

impl MemorySnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn insert(&self, snapshot: &Snapshot) -> Result<(), ScheduleError> {
        let mut map = self.snapshots.write().await;
        if map.contains_key(&snapshot.id) {
            return Err(ScheduleError::Persistence(format!(
                "snapshot {} already exists",
                snapshot.id
            )));
        }
        map.insert(snapshot.id, snapshot.clone());
        Ok(())
    }

    async fn fetch(&self, id: SnapshotId) -> Result<Option<Snapshot>, ScheduleError> {
        Ok(self.snapshots.read().await.get(&id).cloned())
    }

    async fn list(&self, day: NaiveDate) -> Result<Vec<SnapshotSummary>, ScheduleError> {
        let map = self.snapshots.read().await;
        let mut summaries: Vec<SnapshotSummary> = map
            .values()
            .filter(|s| s.day == day)
            .map(SnapshotSummary::from)
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, ScheduleError> {
        let mut map = self.snapshots.write().await;
        let before = map.len();
        map.retain(|_, s| !s.is_expired(now));
        Ok(u64::try_from(before - map.len()).unwrap_or(u64::MAX))
    }
}
