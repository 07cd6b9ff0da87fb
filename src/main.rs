//! squad-shift-gateway server entry point.
//!
//! Starts the Axum HTTP server with the schedule REST endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use squad_shift_gateway::api;
use squad_shift_gateway::app_state::AppState;
use squad_shift_gateway::config::ScheduleConfig;
use squad_shift_gateway::domain::{MutationEngine, TerritoryResolver};
use squad_shift_gateway::persistence::{
    GridStore, MemoryGridStore, PostgresGridStore, PostgresSnapshotStore, SnapshotStore, postgres,
};
use squad_shift_gateway::service::{BackupCoordinator, ScheduleService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ScheduleConfig::from_env()
        .map_err(|err| anyhow::anyhow!("invalid configuration: {err}"))?;
    tracing::info!(addr = %config.listen_addr, "starting squad-shift-gateway");

    let table = config
        .territory_table()
        .context("loading territory table")?;
    tracing::info!(squads = table.roster().len(), "territory table loaded");
    let engine = MutationEngine::new(TerritoryResolver::new(table));

    // Build persistence layer
    let (grids, snapshots) = build_stores(&config).await?;
    let backups = match snapshots {
        Some(store) if config.backup_enabled => {
            BackupCoordinator::enabled(store, config.backup_ttl())
        }
        _ => {
            tracing::warn!("snapshot backups disabled, reverts will be rejected");
            BackupCoordinator::Disabled
        }
    };

    // Build application state
    let app_state = AppState::new(ScheduleService::new(grids, backups, engine));

    if config.backup_sweep_interval_secs > 0 && app_state.schedule_service.backups().is_enabled()
    {
        spawn_expiry_sweep(
            &app_state,
            Duration::from_secs(config.backup_sweep_interval_secs),
        );
    }

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.request_timeout_secs,
                ))),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

type Stores = (Arc<dyn GridStore>, Option<Arc<dyn SnapshotStore>>);

/// PostgreSQL when `DATABASE_URL` is set, process memory otherwise.
async fn build_stores(config: &ScheduleConfig) -> anyhow::Result<Stores> {
    if config.database_url.is_none() {
        tracing::warn!("DATABASE_URL not set, using in-memory grid store");
        let grids: Arc<dyn GridStore> = Arc::new(MemoryGridStore::new());
        return Ok((grids, None));
    }
    let pool = postgres::connect(config)
        .await
        .context("connecting to PostgreSQL")?;
    postgres::ensure_schema(&pool)
        .await
        .context("creating schema")?;
    tracing::info!("connected to PostgreSQL");
    let grids: Arc<dyn GridStore> = Arc::new(PostgresGridStore::new(pool.clone()));
    let snapshots: Arc<dyn SnapshotStore> = Arc::new(PostgresSnapshotStore::new(pool));
    Ok((grids, Some(snapshots)))
}

fn spawn_expiry_sweep(state: &AppState, every: Duration) {
    let service = Arc::clone(&state.schedule_service);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(err) = service.expire_snapshots().await {
                tracing::warn!(error = %err, "snapshot expiry sweep failed");
            }
        }
    });
}

