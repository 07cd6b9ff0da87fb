//! Domain layer: schedule model, mutation engine, and grid codec.
//!
//! Everything in this module is synchronous and free of I/O. The service
//! layer loads a day from the grid store, hands it to the
//! [`MutationEngine`], and writes the result back.

pub mod clock;
pub mod command;
pub mod day_locks;
pub mod grid;
pub mod mutation;
pub mod schedule;
pub mod snapshot_id;
pub mod squad_id;
pub mod tango;
pub mod template;
pub mod territory;

pub use clock::{ClockTime, DAY_START, MINUTES_PER_DAY, TimeRange};
pub use command::{ActionKind, Command, CommandFields, format_date, parse_date};
pub use day_locks::DayLocks;
pub use grid::{Grid, GridFormatter};
pub use mutation::{CrewAction, MutationEngine, MutationReport, SegmentCommand};
pub use schedule::{Coverage, DaySchedule, Shift, ShiftSegment, Squad, shift_name};
pub use snapshot_id::SnapshotId;
pub use squad_id::{SquadId, TerritoryId};
pub use tango::TangoSelector;
pub use template::{ScheduleStatistics, ShiftTemplate, TemplateShift, YearMonth};
pub use territory::{CoveringEntry, TerritoryResolver, TerritoryTable, TerritoryTableFile};
