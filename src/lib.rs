//! # squad-shift-gateway
//!
//! Rolling shift schedules for a rescue squad station.
//!
//! Each day is a list of shifts split into time segments staffed by
//! squads. The crate applies segment mutations (remove a crew, add a
//! shift, obliterate a shift), re-derives the territory each squad covers
//! and the tango (lead) squad of each shift, renders days as a fixed 10x4
//! grid, and snapshots every grid before it changes so any edit can be
//! reverted.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── ScheduleService (service/)
//!     ├── BackupCoordinator (service/)
//!     │
//!     ├── MutationEngine, TerritoryResolver, TangoSelector (domain/)
//!     ├── GridFormatter, ShiftTemplate (domain/)
//!     │
//!     └── Grid and snapshot stores (persistence/): PostgreSQL or memory
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
