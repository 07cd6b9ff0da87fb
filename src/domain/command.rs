//! Validated schedule commands.
//!
//! Requests arrive as loosely typed fields (action name, `YYYYMMDD` date,
//! `HHMM` times, squad number). [`CommandFields::parse`] validates them
//! once at the boundary and produces a [`Command`]; nothing downstream
//! handles raw strings.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use super::clock::{ClockTime, TimeRange};
use super::mutation::{CrewAction, SegmentCommand};
use super::snapshot_id::SnapshotId;
use crate::error::ScheduleError;

/// Action named by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// One of the segment mutations.
    Mutate(CrewAction),
    /// Return the current grid.
    GetCurrent,
    /// Restore a snapshot.
    Revert,
    /// List the snapshots of a day.
    ListSnapshots,
}

impl ActionKind {
    /// Canonical action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mutate(action) => action.as_str(),
            Self::GetCurrent => "get-current",
            Self::Revert => "revert",
            Self::ListSnapshots => "list-snapshots",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ScheduleError;

    /// Accepts canonical names and the legacy aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim() {
            "remove-crew" | "noCrew" => Self::Mutate(CrewAction::RemoveCrew),
            "add-shift" | "addShift" => Self::Mutate(CrewAction::AddShift),
            "obliterate-shift" | "obliterateShift" => Self::Mutate(CrewAction::ObliterateShift),
            "get-current" | "get_schedule_day" => Self::GetCurrent,
            "revert" | "rollback" => Self::Revert,
            "list-snapshots" | "list_backups" => Self::ListSnapshots,
            other => {
                return Err(ScheduleError::InvalidRequest(format!(
                    "unknown action {other:?}"
                )));
            }
        };
        Ok(kind)
    }
}

/// A fully validated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Apply a segment mutation, or only preview its result.
    Mutate {
        /// The mutation.
        command: SegmentCommand,
        /// When `true`, nothing is persisted.
        preview: bool,
    },
    /// Return the current grid of a day.
    GetCurrent {
        /// Target day.
        date: NaiveDate,
    },
    /// Restore a day from a snapshot.
    Revert {
        /// Target day.
        date: NaiveDate,
        /// Snapshot to restore.
        snapshot: SnapshotId,
    },
    /// List the snapshots of a day, most recent first.
    ListSnapshots {
        /// Target day.
        date: NaiveDate,
    },
}

impl Command {
    /// Day the command targets.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Mutate { command, .. } => command.date,
            Self::GetCurrent { date }
            | Self::Revert { date, .. }
            | Self::ListSnapshots { date } => *date,
        }
    }

    /// Action this command performs.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Mutate { command, .. } => ActionKind::Mutate(command.action),
            Self::GetCurrent { .. } => ActionKind::GetCurrent,
            Self::Revert { .. } => ActionKind::Revert,
            Self::ListSnapshots { .. } => ActionKind::ListSnapshots,
        }
    }
}

/// Raw request fields, as received from a query string or JSON body.
#[derive(Debug, Clone, Default)]
pub struct CommandFields<'a> {
    /// Action name or alias.
    pub action: Option<&'a str>,
    /// `YYYYMMDD`.
    pub date: Option<&'a str>,
    /// `HHMM`, `HMM` or `HH:MM`.
    pub shift_start: Option<&'a str>,
    /// `HHMM`, `HMM` or `HH:MM`.
    pub shift_end: Option<&'a str>,
    /// Squad number.
    pub squad: Option<&'a str>,
    /// Snapshot ID for revert.
    pub change_id: Option<&'a str>,
    /// Defaults to `true`.
    pub preview: Option<bool>,
}

impl CommandFields<'_> {
    /// Validates the fields into a [`Command`].
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRequest`] for missing or malformed
    /// fields and [`ScheduleError::InvalidRange`] for an empty range.
    pub fn parse(&self) -> Result<Command, ScheduleError> {
        let kind: ActionKind = required(self.action, "action")?.parse()?;
        let date = parse_date(required(self.date, "date")?)?;

        let command = match kind {
            ActionKind::Mutate(action) => {
                let start = ClockTime::parse_hhmm(required(self.shift_start, "shift_start")?)?;
                let end = ClockTime::parse_hhmm(required(self.shift_end, "shift_end")?)?;
                let squad = required(self.squad, "squad")?.parse()?;
                Command::Mutate {
                    command: SegmentCommand {
                        date,
                        range: TimeRange::command(start, end)?,
                        squad,
                        action,
                    },
                    preview: self.preview.unwrap_or(true),
                }
            }
            ActionKind::GetCurrent => Command::GetCurrent { date },
            ActionKind::Revert => {
                let raw = required(self.change_id, "change_id")?;
                let snapshot = raw.parse::<SnapshotId>().map_err(|_| {
                    ScheduleError::InvalidRequest(format!("invalid change_id {raw:?}"))
                })?;
                Command::Revert { date, snapshot }
            }
            ActionKind::ListSnapshots => Command::ListSnapshots { date },
        };
        Ok(command)
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, ScheduleError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ScheduleError::InvalidRequest(format!("missing parameter {name}")))
}

/// Parses a `YYYYMMDD` date.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidRequest`] if the text is not a valid
/// calendar date in that format.
pub fn parse_date(text: &str) -> Result<NaiveDate, ScheduleError> {
    let text = text.trim();
    if text.len() != 8 {
        return Err(ScheduleError::InvalidRequest(format!(
            "invalid date {text:?}, expected YYYYMMDD"
        )));
    }
    NaiveDate::parse_from_str(text, "%Y%m%d").map_err(|_| {
        ScheduleError::InvalidRequest(format!("invalid date {text:?}, expected YYYYMMDD"))
    })
}

/// Formats a date as `YYYYMMDD`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}
