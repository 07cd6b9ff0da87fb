//! Persistence layer: day grids and snapshots.
//!
//! Both stores sit behind async traits so the service can run on
//! PostgreSQL in production and on in-memory maps in tests or when no
//! database is configured.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{Grid, SnapshotId};
use crate::error::ScheduleError;

pub use memory::{MemoryGridStore, MemorySnapshotStore};
pub use models::{Snapshot, SnapshotSummary};
pub use postgres::{PostgresGridStore, PostgresSnapshotStore};

/// Current grid of each day.
#[async_trait]
pub trait GridStore: Send + Sync + std::fmt::Debug {
    /// Returns the stored grid for `day`, if any.
    async fn get_day(&self, day: NaiveDate) -> Result<Option<Grid>, ScheduleError>;

    /// Replaces the stored grid for `day`.
    async fn put_day(&self, day: NaiveDate, grid: &Grid) -> Result<(), ScheduleError>;
}

/// Immutable snapshot records.
#[async_trait]
pub trait SnapshotStore: Send + Sync + std::fmt::Debug {
    /// Inserts a snapshot atomically.
    async fn insert(&self, snapshot: &Snapshot) -> Result<(), ScheduleError>;

    /// Fetches a snapshot by ID.
    async fn fetch(&self, id: SnapshotId) -> Result<Option<Snapshot>, ScheduleError>;

    /// Lists the snapshots of `day`, most recent first.
    async fn list(&self, day: NaiveDate) -> Result<Vec<SnapshotSummary>, ScheduleError>;

    /// Deletes every snapshot expired at `now` and returns how many.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, ScheduleError>;
}
