//! Data Transfer Objects for REST request/response serialization.
//!
//! Dates on the wire are `YYYYMMDD` strings and times are `HHMM`, matching
//! the grid cells.

pub mod command_dto;
pub mod schedule_dto;

pub use command_dto::*;
pub use schedule_dto::*;
