//! Minute-resolution time of day and circular time ranges.
//!
//! Schedules live on a 24-hour circle: a range whose start is later than
//! its end wraps through midnight. All interval arithmetic is done on the
//! circle, modulo [`MINUTES_PER_DAY`].

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ScheduleError;

/// Minutes in one day.
pub const MINUTES_PER_DAY: u16 = 1440;

/// Time of day at which a schedule day begins (06:00).
///
/// Shifts are ordered relative to this point, so a shift starting at 02:00
/// sorts after one starting at 18:00.
pub const DAY_START: ClockTime = ClockTime(360);

/// Time of day with minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    /// Midnight.
    pub const MIDNIGHT: Self = Self(0);

    /// Creates a time from hours and minutes.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRequest`] if `hour > 23` or
    /// `minute > 59`.
    pub fn from_hm(hour: u16, minute: u16) -> Result<Self, ScheduleError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidRequest(format!(
                "invalid time of day {hour:02}:{minute:02}"
            )));
        }
        Ok(Self(hour * 60 + minute))
    }

    /// Creates a time from minutes since midnight, wrapping past 24:00.
    #[must_use]
    pub const fn from_minutes(minutes: u16) -> Self {
        Self(minutes % MINUTES_PER_DAY)
    }

    /// Minutes since midnight.
    #[must_use]
    pub const fn minutes(self) -> u16 {
        self.0
    }

    /// Hour component.
    #[must_use]
    pub const fn hour(self) -> u16 {
        self.0 / 60
    }

    /// Minute component.
    #[must_use]
    pub const fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Minutes travelled forward around the clock from `origin` to `self`.
    #[must_use]
    pub const fn offset_from(self, origin: Self) -> u16 {
        (self.0 + MINUTES_PER_DAY - origin.0) % MINUTES_PER_DAY
    }

    /// Position of this time within a schedule day that begins at
    /// [`DAY_START`].
    #[must_use]
    pub const fn day_order(self) -> u16 {
        self.offset_from(DAY_START)
    }

    /// Formats as `HHMM`.
    #[must_use]
    pub fn hhmm(self) -> String {
        format!("{:02}{:02}", self.hour(), self.minute())
    }

    /// Parses `HHMM`, `HMM` or `HH:MM`.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRequest`] if the text is not a valid
    /// time of day.
    pub fn parse_hhmm(text: &str) -> Result<Self, ScheduleError> {
        let text = text.trim();
        let padded;
        let (candidate, format) = if text.contains(':') {
            (text, "%H:%M")
        } else if text.len() == 3 {
            padded = format!("0{text}");
            (padded.as_str(), "%H%M")
        } else {
            (text, "%H%M")
        };
        let parsed = NaiveTime::parse_from_str(candidate, format)
            .map_err(|_| ScheduleError::InvalidRequest(format!("invalid time {text:?}")))?;
        Self::from_hm(parsed.hour() as u16, parsed.minute() as u16)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hhmm(s)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        // Accept `HH:MM:SS` as produced by older schedule exports.
        let trimmed = match text.len() {
            8 if text.matches(':').count() == 2 => text.get(..5).unwrap_or(&text),
            _ => text.as_str(),
        };
        Self::parse_hhmm(trimmed).map_err(serde::de::Error::custom)
    }
}

/// Half-open range `[start, end)` on the 24-hour circle.
///
/// `start == end` denotes the whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    /// Inclusive start.
    pub start: ClockTime,
    /// Exclusive end.
    pub end: ClockTime,
}

impl TimeRange {
    /// Creates a range. Any pair of times is accepted.
    #[must_use]
    pub const fn new(start: ClockTime, end: ClockTime) -> Self {
        Self { start, end }
    }

    /// Creates a non-empty command range.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRange`] if `start == end`.
    pub fn command(start: ClockTime, end: ClockTime) -> Result<Self, ScheduleError> {
        if start == end {
            return Err(ScheduleError::InvalidRange(format!(
                "start equals end ({})",
                start.hhmm()
            )));
        }
        Ok(Self { start, end })
    }

    /// Length in minutes (1..=1440).
    #[must_use]
    pub const fn len_minutes(&self) -> u16 {
        match self.end.offset_from(self.start) {
            0 => MINUTES_PER_DAY,
            n => n,
        }
    }

    /// Returns `true` if the range passes through midnight.
    #[must_use]
    pub const fn wraps(&self) -> bool {
        self.start.0 >= self.end.0 && self.end.0 != 0
    }

    /// The range as linear `[start, end)` minute pairs within one day.
    ///
    /// A wrapping range yields `[start, 1440)` and `[0, end)`.
    #[must_use]
    pub fn linear_parts(&self) -> Vec<(u16, u16)> {
        let start = self.start.0;
        let end = self.end.0;
        if start < end {
            vec![(start, end)]
        } else if end == 0 {
            vec![(start, MINUTES_PER_DAY)]
        } else if start == 0 {
            vec![(0, end)]
        } else {
            vec![(start, MINUTES_PER_DAY), (0, end)]
        }
    }

    /// Returns `true` if the minute starting at `time` lies in the range.
    #[must_use]
    pub fn contains(&self, time: ClockTime) -> bool {
        self.linear_parts()
            .iter()
            .any(|&(lo, hi)| time.0 >= lo && time.0 < hi)
    }

    /// Returns `true` if `time` lies strictly between start and end, i.e.
    /// cutting the range at `time` yields two non-empty pieces.
    #[must_use]
    pub const fn strictly_inside(&self, time: ClockTime) -> bool {
        let offset = time.offset_from(self.start);
        offset > 0 && offset < self.len_minutes()
    }

    /// Returns `true` if the two ranges share at least one minute.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.contains(other.start) || other.contains(self.start)
    }

    /// Iterates the minutes of the range in clock order from `start`.
    pub fn minutes(&self) -> impl Iterator<Item = ClockTime> + '_ {
        (0..self.len_minutes()).map(move |m| ClockTime::from_minutes(self.start.0 + m))
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.hhmm(), self.end.hhmm())
    }
}
