//! In-memory schedule model: days, shifts, segments and squads.
//!
//! A [`DaySchedule`] holds non-overlapping [`Shift`]s in day order. Each
//! shift is cut into contiguous [`ShiftSegment`]s of constant squad
//! composition. The model is richer than the persisted grid (which only
//! shows the first segment of each shift); see [`DaySchedule::into_grid_layout`].

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::clock::{ClockTime, DAY_START, TimeRange};
use super::squad_id::{SquadId, TerritoryId};

/// Territories a squad covers within a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    /// Sole active squad: covers every territory.
    All,
    /// Explicit territory set. Empty for squads marked "No Crew" and for
    /// squads not yet resolved.
    Listed(BTreeSet<TerritoryId>),
}

impl Default for Coverage {
    fn default() -> Self {
        Self::none()
    }
}

impl Coverage {
    /// Empty explicit coverage.
    #[must_use]
    pub fn none() -> Self {
        Self::Listed(BTreeSet::new())
    }
}

/// A squad listed on a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Squad {
    /// Squad identifier.
    pub id: SquadId,
    /// Territories covered during the segment.
    #[serde(default)]
    pub territories: Coverage,
    /// `false` means the squad is listed but marked "No Crew".
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Squad {
    /// Creates an active squad with no territories resolved yet.
    #[must_use]
    pub fn active(id: SquadId) -> Self {
        Self {
            id,
            territories: Coverage::none(),
            active: true,
        }
    }

    /// Creates a squad marked "No Crew".
    #[must_use]
    pub fn no_crew(id: SquadId) -> Self {
        Self {
            id,
            territories: Coverage::none(),
            active: false,
        }
    }
}

/// Sub-interval of a shift with constant squad composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ShiftSegment {
    /// Segment start.
    #[schema(value_type = String, example = "18:00")]
    pub start_time: ClockTime,
    /// Segment end (exclusive).
    #[schema(value_type = String, example = "06:00")]
    pub end_time: ClockTime,
    /// Squads on the segment, ascending by ID.
    pub squads: Vec<Squad>,
}

impl ShiftSegment {
    /// Creates a segment, sorting the squads by ID.
    #[must_use]
    pub fn new(start_time: ClockTime, end_time: ClockTime, mut squads: Vec<Squad>) -> Self {
        squads.sort_by_key(|s| s.id);
        Self {
            start_time,
            end_time,
            squads,
        }
    }

    /// Range covered by the segment.
    #[must_use]
    pub const fn range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }

    /// IDs of squads active on the segment, ascending.
    #[must_use]
    pub fn active_ids(&self) -> Vec<SquadId> {
        self.squads
            .iter()
            .filter(|s| s.active)
            .map(|s| s.id)
            .collect()
    }

    /// Squad composition used to decide whether neighbours can merge.
    #[must_use]
    pub fn composition(&self) -> Vec<(SquadId, bool)> {
        self.squads.iter().map(|s| (s.id, s.active)).collect()
    }

    /// Looks up a squad by ID.
    #[must_use]
    pub fn squad(&self, id: SquadId) -> Option<&Squad> {
        self.squads.iter().find(|s| s.id == id)
    }
}

/// Named top-level time block of a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Shift {
    /// Display name, derived from the times.
    pub name: String,
    /// Shift start.
    #[schema(value_type = String, example = "18:00")]
    pub start_time: ClockTime,
    /// Shift end (exclusive); may wrap past midnight.
    #[schema(value_type = String, example = "06:00")]
    pub end_time: ClockTime,
    /// Contiguous segments covering `[start_time, end_time)`.
    pub segments: Vec<ShiftSegment>,
    /// Lead squad for the shift.
    pub tango: Option<SquadId>,
}

impl Shift {
    /// Creates a shift with a single segment spanning it.
    #[must_use]
    pub fn single(start_time: ClockTime, end_time: ClockTime, squads: Vec<Squad>) -> Self {
        Self {
            name: shift_name(start_time, end_time),
            start_time,
            end_time,
            segments: vec![ShiftSegment::new(start_time, end_time, squads)],
            tango: None,
        }
    }

    /// Creates a shift from explicit segments.
    #[must_use]
    pub fn with_segments(
        start_time: ClockTime,
        end_time: ClockTime,
        segments: Vec<ShiftSegment>,
    ) -> Self {
        Self {
            name: shift_name(start_time, end_time),
            start_time,
            end_time,
            segments,
            tango: None,
        }
    }

    /// Range covered by the shift.
    #[must_use]
    pub const fn range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }

    /// IDs of squads active in any segment, ascending and de-duplicated.
    #[must_use]
    pub fn active_ids(&self) -> Vec<SquadId> {
        let ids: BTreeSet<SquadId> = self
            .segments
            .iter()
            .flat_map(ShiftSegment::active_ids)
            .collect();
        ids.into_iter().collect()
    }

    /// Returns `true` if no segment lists any squad.
    #[must_use]
    pub fn is_vacant(&self) -> bool {
        self.segments.iter().all(|seg| seg.squads.is_empty())
    }

    /// Length in hours.
    #[must_use]
    pub fn hours(&self) -> f64 {
        f64::from(self.range().len_minutes()) / 60.0
    }
}

/// Starts of the day and night blocks. Grid rows are never joined across
/// them.
const BLOCK_BOUNDARIES: [ClockTime; 2] = [DAY_START, ClockTime::from_minutes(18 * 60)];

/// Derives the display name for a shift.
#[must_use]
pub fn shift_name(start: ClockTime, end: ClockTime) -> String {
    match (start.hhmm().as_str(), end.hhmm().as_str()) {
        ("0600", "1800") => "Day Shift".to_string(),
        ("1800", "0600") => "Night Shift".to_string(),
        _ => format!("{start} - {end} Shift"),
    }
}

/// One calendar day of coverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DaySchedule {
    /// Calendar date.
    pub date: NaiveDate,
    /// Shifts in day order.
    pub shifts: Vec<Shift>,
}

impl DaySchedule {
    /// Creates an empty day.
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            shifts: Vec::new(),
        }
    }

    /// Human label, e.g. `"Monday 2026-01-05"`.
    #[must_use]
    pub fn day_label(&self) -> String {
        self.date.format("%A %Y-%m-%d").to_string()
    }

    /// Day of month.
    #[must_use]
    pub fn day_of_month(&self) -> u32 {
        self.date.day()
    }

    /// Sorts shifts into day order (the day begins at 06:00).
    pub fn sort_shifts(&mut self) {
        self.shifts.sort_by_key(|s| s.start_time.day_order());
    }

    /// Tango of the last shift that has one.
    #[must_use]
    pub fn final_tango(&self) -> Option<SquadId> {
        self.shifts.iter().rev().find_map(|s| s.tango)
    }

    /// Rewrites the day so every segment is its own single-segment shift.
    ///
    /// The grid can only show one segment per shift row, so this layout is
    /// what gets persisted. Tango must be re-derived afterwards.
    #[must_use]
    pub fn into_grid_layout(self) -> Self {
        let shifts = self
            .shifts
            .into_iter()
            .flat_map(|shift| {
                if shift.segments.len() <= 1 {
                    vec![shift]
                } else {
                    shift
                        .segments
                        .into_iter()
                        .map(|seg| {
                            let (start, end) = (seg.start_time, seg.end_time);
                            Shift::with_segments(start, end, vec![seg])
                        })
                        .collect()
                }
            })
            .collect();
        Self {
            date: self.date,
            shifts,
        }
    }

    /// Joins abutting grid rows back into multi-segment shifts.
    ///
    /// Inverse of [`Self::into_grid_layout`]: a row that starts where the
    /// previous row ends becomes another segment of that shift, unless it
    /// starts on a block boundary (06:00 or 18:00). Segments are kept as
    /// they are; merging identical neighbours and re-deriving tango is left
    /// to the mutation engine.
    #[must_use]
    pub fn coalesce_rows(mut self) -> Self {
        self.sort_shifts();
        let mut shifts: Vec<Shift> = Vec::with_capacity(self.shifts.len());
        for shift in self.shifts {
            match shifts.last_mut() {
                Some(prev)
                    if prev.end_time == shift.start_time
                        && !BLOCK_BOUNDARIES.contains(&shift.start_time) =>
                {
                    prev.end_time = shift.end_time;
                    prev.name = shift_name(prev.start_time, prev.end_time);
                    prev.tango = None;
                    prev.segments.extend(shift.segments);
                }
                _ => shifts.push(shift),
            }
        }
        Self {
            date: self.date,
            shifts,
        }
    }

    /// Checks the structural invariants: segments tile their shift, and no
    /// two shifts overlap.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let tiles = self.shifts.iter().all(|shift| {
            let Some(first) = shift.segments.first() else {
                return false;
            };
            let mut cursor = first.start_time;
            let mut covered: u32 = 0;
            for seg in &shift.segments {
                if seg.start_time != cursor {
                    return false;
                }
                covered += u32::from(seg.range().len_minutes());
                cursor = seg.end_time;
            }
            first.start_time == shift.start_time
                && cursor == shift.end_time
                && covered == u32::from(shift.range().len_minutes())
        });
        let disjoint = self.shifts.iter().enumerate().all(|(i, a)| {
            self.shifts
                .iter()
                .skip(i + 1)
                .all(|b| !a.range().overlaps(&b.range()))
        });
        tiles && disjoint
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn t(text: &str) -> ClockTime {
        let Ok(time) = ClockTime::parse_hhmm(text) else {
            panic!("bad test time {text}");
        };
        time
    }

    fn date() -> NaiveDate {
        let Some(date) = NaiveDate::from_ymd_opt(2026, 1, 5) else {
            panic!("valid date");
        };
        date
    }

    #[test]
    fn names_follow_standard_blocks() {
        assert_eq!(shift_name(t("0600"), t("1800")), "Day Shift");
        assert_eq!(shift_name(t("1800"), t("0600")), "Night Shift");
        assert_eq!(shift_name(t("1900"), t("2100")), "19:00 - 21:00 Shift");
    }

    #[test]
    fn segment_sorts_squads() {
        let seg = ShiftSegment::new(
            t("0600"),
            t("1800"),
            vec![Squad::active(SquadId::new(54)), Squad::active(SquadId::new(34))],
        );
        assert_eq!(seg.active_ids(), vec![SquadId::new(34), SquadId::new(54)]);
    }

    #[test]
    fn label_includes_weekday() {
        let day = DaySchedule::new(date());
        assert_eq!(day.day_label(), "Monday 2026-01-05");
        assert_eq!(day.day_of_month(), 5);
    }

    #[test]
    fn sort_places_night_after_day() {
        let mut day = DaySchedule::new(date());
        day.shifts.push(Shift::single(t("1800"), t("0600"), vec![]));
        day.shifts.push(Shift::single(t("0600"), t("1800"), vec![]));
        day.sort_shifts();
        assert_eq!(day.shifts.first().map(|s| s.start_time), Some(t("0600")));
    }

    #[test]
    fn grid_layout_splits_segments() {
        let mut day = DaySchedule::new(date());
        day.shifts.push(Shift::with_segments(
            t("1800"),
            t("0600"),
            vec![
                ShiftSegment::new(t("1800"), t("0000"), vec![Squad::active(SquadId::new(42))]),
                ShiftSegment::new(t("0000"), t("0600"), vec![Squad::active(SquadId::new(43))]),
            ],
        ));
        let laid_out = day.into_grid_layout();
        assert_eq!(laid_out.shifts.len(), 2);
        assert!(laid_out.is_well_formed());
        assert_eq!(
            laid_out.shifts.get(1).map(|s| s.name.as_str()),
            Some("00:00 - 06:00 Shift")
        );
    }

    #[test]
    fn coalesce_rejoins_rows_within_a_block() {
        let mut day = DaySchedule::new(date());
        day.shifts.push(Shift::with_segments(
            t("1800"),
            t("0600"),
            vec![
                ShiftSegment::new(t("1800"), t("1900"), vec![Squad::active(SquadId::new(42))]),
                ShiftSegment::new(t("1900"), t("2100"), vec![Squad::no_crew(SquadId::new(42))]),
                ShiftSegment::new(t("2100"), t("0600"), vec![Squad::active(SquadId::new(42))]),
            ],
        ));
        let original = day.clone();
        let rejoined = day.into_grid_layout().coalesce_rows();
        assert_eq!(rejoined.shifts.len(), 1);
        assert_eq!(rejoined, original);
    }

    #[test]
    fn coalesce_keeps_block_boundaries() {
        let mut day = DaySchedule::new(date());
        day.shifts.push(Shift::single(t("0000"), t("0600"), vec![]));
        day.shifts.push(Shift::single(t("1800"), t("0000"), vec![]));
        day.shifts.push(Shift::single(t("1200"), t("1800"), vec![]));
        day.shifts.push(Shift::single(t("0600"), t("1200"), vec![]));
        let rejoined = day.coalesce_rows();
        let ranges: Vec<(ClockTime, ClockTime, usize)> = rejoined
            .shifts
            .iter()
            .map(|s| (s.start_time, s.end_time, s.segments.len()))
            .collect();
        assert_eq!(
            ranges,
            vec![(t("0600"), t("1800"), 2), (t("1800"), t("0600"), 2)]
        );
        let names: Vec<&str> = rejoined.shifts.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Day Shift", "Night Shift"]);
        assert!(rejoined.is_well_formed());
    }

    #[test]
    fn well_formed_detects_gaps_and_overlaps() {
        let mut day = DaySchedule::new(date());
        day.shifts.push(Shift::with_segments(
            t("0600"),
            t("1800"),
            vec![ShiftSegment::new(t("0600"), t("1200"), vec![])],
        ));
        assert!(!day.is_well_formed());

        let mut day = DaySchedule::new(date());
        day.shifts.push(Shift::single(t("0600"), t("1800"), vec![]));
        day.shifts.push(Shift::single(t("1700"), t("1900"), vec![]));
        assert!(!day.is_well_formed());
    }

    #[test]
    fn squad_json_defaults_to_active() {
        let Ok(squad) = serde_json::from_str::<Squad>(r#"{"id": 35}"#) else {
            panic!("squad should deserialize");
        };
        assert!(squad.active);
        assert_eq!(squad.territories, Coverage::none());
    }
}
