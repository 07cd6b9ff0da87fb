//! Service layer: command orchestration.
//!
//! [`ScheduleService`] runs validated commands against the grid store,
//! delegating schedule edits to the domain's mutation engine and
//! snapshots to the [`BackupCoordinator`].

pub mod backup_coordinator;
pub mod schedule_service;

pub use backup_coordinator::BackupCoordinator;
pub use schedule_service::{CommandOutcome, MonthReport, ScheduleService};
