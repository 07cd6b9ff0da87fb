//! Service configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).
//!
//! | Variable                        | Default         |
//! |---------------------------------|-----------------|
//! | `LISTEN_ADDR`                   | `0.0.0.0:3000`  |
//! | `DATABASE_URL`                  | unset (memory)  |
//! | `DATABASE_MAX_CONNECTIONS`      | `10`            |
//! | `DATABASE_MIN_CONNECTIONS`      | `2`             |
//! | `DATABASE_CONNECT_TIMEOUT_SECS` | `5`             |
//! | `BACKUP_ENABLED`                | `true`          |
//! | `BACKUP_TTL_DAYS`               | `30`            |
//! | `BACKUP_SWEEP_INTERVAL_SECS`    | `3600`          |
//! | `TERRITORY_TABLE_PATH`          | built-in table  |
//! | `REQUEST_TIMEOUT_SECS`          | `30`            |

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;

use crate::domain::TerritoryTable;
use crate::error::ScheduleError;

/// Top-level service configuration.
///
/// Loaded once at startup via [`ScheduleConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// PostgreSQL connection string. `None` runs on in-memory stores with
    /// backups disabled.
    pub database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    pub database_max_connections: u32,

    /// Minimum idle connections in the pool.
    pub database_min_connections: u32,

    /// Timeout in seconds for acquiring a database connection.
    pub database_connect_timeout_secs: u64,

    /// Master switch for snapshots.
    pub backup_enabled: bool,

    /// Days a snapshot is kept before the sweep deletes it.
    pub backup_ttl_days: u32,

    /// Seconds between expiry sweeps (0 = never).
    pub backup_sweep_interval_secs: u64,

    /// JSON territory table replacing the built-in station table.
    pub territory_table_path: Option<PathBuf>,

    /// Seconds before an HTTP request is aborted.
    pub request_timeout_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            database_max_connections: 10,
            database_min_connections: 2,
            database_connect_timeout_secs: 5,
            backup_enabled: true,
            backup_ttl_days: 30,
            backup_sweep_interval_secs: 3600,
            territory_table_path: None,
            request_timeout_secs: 30,
        }
    }
}

impl ScheduleConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| defaults.listen_addr.to_string())
            .parse()?;

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Ok(Self {
            listen_addr,
            database_url,
            database_max_connections: parse_env(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            database_min_connections: parse_env(
                "DATABASE_MIN_CONNECTIONS",
                defaults.database_min_connections,
            ),
            database_connect_timeout_secs: parse_env(
                "DATABASE_CONNECT_TIMEOUT_SECS",
                defaults.database_connect_timeout_secs,
            ),
            backup_enabled: parse_env_bool("BACKUP_ENABLED", defaults.backup_enabled),
            backup_ttl_days: parse_env("BACKUP_TTL_DAYS", defaults.backup_ttl_days),
            backup_sweep_interval_secs: parse_env(
                "BACKUP_SWEEP_INTERVAL_SECS",
                defaults.backup_sweep_interval_secs,
            ),
            territory_table_path: std::env::var("TERRITORY_TABLE_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
        })
    }

    /// Snapshot lifetime.
    #[must_use]
    pub fn backup_ttl(&self) -> Duration {
        Duration::days(i64::from(self.backup_ttl_days))
    }

    /// Loads the configured territory table, or the built-in one.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRequest`] if the configured file
    /// cannot be read or fails validation.
    pub fn territory_table(&self) -> Result<TerritoryTable, ScheduleError> {
        match &self.territory_table_path {
            Some(path) => TerritoryTable::load(path),
            None => TerritoryTable::station_default(),
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|v| v.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}
