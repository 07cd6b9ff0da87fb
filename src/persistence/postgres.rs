//! PostgreSQL implementation of the grid and snapshot stores.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::models::{Snapshot, SnapshotSummary};
use super::{GridStore, SnapshotStore};
use crate::config::ScheduleConfig;
use crate::domain::{Grid, SnapshotId};
use crate::error::ScheduleError;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS day_grids (\
         day DATE PRIMARY KEY, \
         grid_csv TEXT NOT NULL, \
         updated_at TIMESTAMPTZ NOT NULL DEFAULT now())",
    "CREATE TABLE IF NOT EXISTS day_snapshots (\
         id UUID PRIMARY KEY, \
         day DATE NOT NULL, \
         description TEXT NOT NULL, \
         command TEXT NOT NULL, \
         csv_data TEXT NOT NULL, \
         created_at TIMESTAMPTZ NOT NULL, \
         expires_at TIMESTAMPTZ NOT NULL)",
    "CREATE INDEX IF NOT EXISTS day_snapshots_day_idx ON day_snapshots (day, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS day_snapshots_expiry_idx ON day_snapshots (expires_at)",
];

/// Opens a connection pool using the configured limits.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidRequest`] if no database URL is
/// configured, and a store error if the connection fails.
pub async fn connect(config: &ScheduleConfig) -> Result<PgPool, ScheduleError> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| ScheduleError::InvalidRequest("DATABASE_URL is not set".to_string()))?;
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(url)
        .await?;
    Ok(pool)
}

/// Creates the tables if they do not exist yet.
///
/// # Errors
///
/// Returns a store error if any statement fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), ScheduleError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Day grids in the `day_grids` table.
#[derive(Debug, Clone)]
pub struct PostgresGridStore {
    pool: PgPool,
}

impl PostgresGridStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GridStore for PostgresGridStore {
    async fn get_day(&self, day: NaiveDate) -> Result<Option<Grid>, ScheduleError> {
        let row = sqlx::query_scalar::<_, String>("SELECT grid_csv FROM day_grids WHERE day = $1")
            .bind(day)
            .fetch_optional(&self.pool)
            .await?;
        row.as_deref().map(Grid::from_csv).transpose()
    }

    async fn put_day(&self, day: NaiveDate, grid: &Grid) -> Result<(), ScheduleError> {
        sqlx::query(
            "INSERT INTO day_grids (day, grid_csv, updated_at) VALUES ($1, $2, now()) \
             ON CONFLICT (day) DO UPDATE SET grid_csv = EXCLUDED.grid_csv, updated_at = now()",
        )
        .bind(day)
        .bind(grid.to_csv()?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Snapshots in the `day_snapshots` table.
#[derive(Debug, Clone)]
pub struct PostgresSnapshotStore {
    pool: PgPool,
}

impl PostgresSnapshotStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type SnapshotRow = (
    Uuid,
    NaiveDate,
    String,
    String,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

type SummaryRow = (Uuid, NaiveDate, String, String, DateTime<Utc>, DateTime<Utc>);

#[async_trait]
impl SnapshotStore for PostgresSnapshotStore {
    async fn insert(&self, snapshot: &Snapshot) -> Result<(), ScheduleError> {
        sqlx::query(
            "INSERT INTO day_snapshots \
             (id, day, description, command, csv_data, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(*snapshot.id.as_uuid())
        .bind(snapshot.day)
        .bind(&snapshot.description)
        .bind(&snapshot.command)
        .bind(&snapshot.csv_data)
        .bind(snapshot.created_at)
        .bind(snapshot.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch(&self, id: SnapshotId) -> Result<Option<Snapshot>, ScheduleError> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            "SELECT id, day, description, command, csv_data, created_at, expires_at \
             FROM day_snapshots WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(id, day, description, command, csv_data, created_at, expires_at)| Snapshot {
                id: SnapshotId::from_uuid(id),
                day,
                description,
                command,
                csv_data,
                created_at,
                expires_at,
            },
        ))
    }

    async fn list(&self, day: NaiveDate) -> Result<Vec<SnapshotSummary>, ScheduleError> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            "SELECT id, day, description, command, created_at, expires_at \
             FROM day_snapshots WHERE day = $1 ORDER BY created_at DESC",
        )
        .bind(day)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, day, description, command, created_at, expires_at)| SnapshotSummary {
                    id: SnapshotId::from_uuid(id),
                    day,
                    description,
                    command,
                    created_at,
                    expires_at,
                },
            )
            .collect())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, ScheduleError> {
        let result = sqlx::query("DELETE FROM day_snapshots WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
