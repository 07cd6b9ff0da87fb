//! Segment mutation engine.
//!
//! Applies one [`SegmentCommand`] to a [`DaySchedule`]:
//!
//! 1. cut every segment at the command's start and end where they fall
//!    strictly inside it,
//! 2. apply the [`CrewAction`] to every piece that lies inside the range,
//! 3. for [`CrewAction::AddShift`], create new shifts over the parts of the
//!    range no shift covers,
//! 4. merge neighbouring segments of identical composition, drop the shifts
//!    this command left without any squad, and re-derive territories and
//!    tango.
//!
//! The engine works on a copy and only replaces the caller's schedule once
//! every step has succeeded, so a failed command leaves the day untouched.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::clock::{ClockTime, TimeRange};
use super::schedule::{DaySchedule, Shift, ShiftSegment, Squad, shift_name};
use super::squad_id::SquadId;
use super::tango::TangoSelector;
use super::territory::TerritoryResolver;
use crate::error::ScheduleError;

/// Operation applied to a squad over a time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CrewAction {
    /// Mark the squad "No Crew" inside the range; it stays listed.
    RemoveCrew,
    /// Put the squad on duty inside the range, creating shifts as needed.
    AddShift,
    /// Delete the squad's entry inside the range.
    ObliterateShift,
}

impl CrewAction {
    /// Canonical action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RemoveCrew => "remove-crew",
            Self::AddShift => "add-shift",
            Self::ObliterateShift => "obliterate-shift",
        }
    }

    /// Name used by the legacy query surface.
    #[must_use]
    pub const fn legacy_name(self) -> &'static str {
        match self {
            Self::RemoveCrew => "noCrew",
            Self::AddShift => "addShift",
            Self::ObliterateShift => "obliterateShift",
        }
    }
}

impl fmt::Display for CrewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated mutation request for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentCommand {
    /// Target day.
    pub date: NaiveDate,
    /// Affected range; never empty.
    pub range: TimeRange,
    /// Squad the action applies to.
    pub squad: SquadId,
    /// What to do.
    pub action: CrewAction,
}

impl SegmentCommand {
    /// Audit string recorded with snapshots, e.g.
    /// `action=noCrew&date=20260105&shift_start=1900&shift_end=2100&squad=42`.
    #[must_use]
    pub fn audit_string(&self) -> String {
        format!(
            "action={}&date={}&shift_start={}&shift_end={}&squad={}",
            self.action.legacy_name(),
            self.date.format("%Y%m%d"),
            self.range.start.hhmm(),
            self.range.end.hhmm(),
            self.squad
        )
    }

    /// Human description recorded with snapshots, e.g.
    /// `noCrew - Squad 42 (1900-2100)`.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "{} - Squad {} ({})",
            self.action.legacy_name(),
            self.squad,
            self.range
        )
    }
}

/// What a successful mutation changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationReport {
    /// Segments inside the range that the action touched.
    pub segments_touched: usize,
    /// Shifts created over uncovered time.
    pub shifts_created: usize,
    /// Shifts removed because the command left no squad on them.
    pub shifts_removed: usize,
}

/// Applies segment commands and keeps derived fields consistent.
#[derive(Debug, Clone)]
pub struct MutationEngine {
    resolver: TerritoryResolver,
}

impl MutationEngine {
    /// Creates an engine over the given resolver.
    #[must_use]
    pub fn new(resolver: TerritoryResolver) -> Self {
        Self { resolver }
    }

    /// The resolver used for territory re-derivation.
    #[must_use]
    pub fn resolver(&self) -> &TerritoryResolver {
        &self.resolver
    }

    /// Applies `command` to `day`.
    ///
    /// `prior_tango` is the final tango of the previous day, if known.
    ///
    /// # Errors
    ///
    /// - [`ScheduleError::DayNotFound`] if the command targets another day.
    /// - [`ScheduleError::InvalidRange`] if the range is empty or the squad
    ///   is not on the roster.
    /// - [`ScheduleError::UnknownCombination`] if the result puts a squad
    ///   combination on duty that the territory table does not cover.
    ///
    /// On error `day` is left unchanged.
    pub fn apply(
        &self,
        day: &mut DaySchedule,
        command: &SegmentCommand,
        prior_tango: Option<SquadId>,
    ) -> Result<MutationReport, ScheduleError> {
        if command.date != day.date {
            return Err(ScheduleError::DayNotFound(command.date));
        }
        let range = TimeRange::command(command.range.start, command.range.end)?;
        if !self.resolver.table().is_rostered(command.squad) {
            return Err(ScheduleError::InvalidRange(format!(
                "squad {} is not on the roster",
                command.squad
            )));
        }

        let mut working = day.clone();
        let mut report = MutationReport::default();
        let mut touched = Vec::with_capacity(working.shifts.len());

        for shift in &mut working.shifts {
            let pieces = std::mem::take(&mut shift.segments)
                .into_iter()
                .flat_map(|seg| split_segment(seg, range))
                .collect();
            shift.segments = pieces;

            let mut hit = false;
            for seg in shift
                .segments
                .iter_mut()
                .filter(|seg| range.contains(seg.start_time))
            {
                apply_action(seg, command.action, command.squad);
                report.segments_touched += 1;
                hit = true;
            }
            touched.push(hit);
        }

        if command.action == CrewAction::AddShift {
            for run in uncovered_runs(&working, range) {
                working
                    .shifts
                    .push(Shift::single(run.start, run.end, vec![Squad::active(command.squad)]));
                report.shifts_created += 1;
            }
        }

        // Only shifts this command emptied are dropped; created shifts
        // follow the touched ones and are never vacant.
        let before = working.shifts.len();
        let mut touched = touched.into_iter();
        working
            .shifts
            .retain(|shift| !(touched.next().unwrap_or(false) && shift.is_vacant()));
        report.shifts_removed = before - working.shifts.len();

        self.rederive(&mut working, prior_tango)?;
        *day = working;
        Ok(report)
    }

    /// Canonicalizes a day supplied from outside: squads sorted and
    /// de-duplicated, neighbours merged, territories and tango re-derived.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRequest`] if segments do not tile
    /// their shifts or shifts overlap, and propagates
    /// [`ScheduleError::UnknownCombination`].
    pub fn normalize(
        &self,
        day: &mut DaySchedule,
        prior_tango: Option<SquadId>,
    ) -> Result<(), ScheduleError> {
        let mut working = day.clone();
        for shift in &mut working.shifts {
            shift.name = shift_name(shift.start_time, shift.end_time);
            for seg in &mut shift.segments {
                seg.squads.sort_by_key(|s| s.id);
                seg.squads.dedup_by_key(|s| s.id);
            }
        }
        if !working.is_well_formed() {
            return Err(ScheduleError::InvalidRequest(format!(
                "shifts for {} overlap or have gaps between segments",
                working.date
            )));
        }
        self.rederive(&mut working, prior_tango)?;
        *day = working;
        Ok(())
    }

    /// Merges identical neighbours, orders shifts, and re-runs territory
    /// resolution and tango selection over the whole day.
    ///
    /// # Errors
    ///
    /// Propagates [`ScheduleError::UnknownCombination`].
    pub fn rederive(
        &self,
        day: &mut DaySchedule,
        prior_tango: Option<SquadId>,
    ) -> Result<(), ScheduleError> {
        for shift in &mut day.shifts {
            merge_segments(&mut shift.segments);
        }
        day.sort_shifts();
        self.resolver.assign_day(day)?;
        TangoSelector::assign(&mut day.shifts, prior_tango);
        Ok(())
    }
}

/// Cuts a segment at the range boundaries that fall strictly inside it.
fn split_segment(segment: ShiftSegment, range: TimeRange) -> Vec<ShiftSegment> {
    let span = segment.range();
    let mut cuts: Vec<ClockTime> = [range.start, range.end]
        .into_iter()
        .filter(|cut| span.strictly_inside(*cut))
        .collect();
    if cuts.is_empty() {
        return vec![segment];
    }
    cuts.sort_by_key(|cut| cut.offset_from(segment.start_time));
    cuts.dedup();

    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let mut from = segment.start_time;
    for cut in cuts {
        pieces.push(ShiftSegment::new(from, cut, segment.squads.clone()));
        from = cut;
    }
    pieces.push(ShiftSegment::new(from, segment.end_time, segment.squads));
    pieces
}

fn apply_action(segment: &mut ShiftSegment, action: CrewAction, squad: SquadId) {
    match action {
        CrewAction::RemoveCrew => {
            if let Some(entry) = segment.squads.iter_mut().find(|s| s.id == squad) {
                entry.active = false;
            }
        }
        CrewAction::AddShift => {
            if let Some(entry) = segment.squads.iter_mut().find(|s| s.id == squad) {
                entry.active = true;
            } else {
                segment.squads.push(Squad::active(squad));
                segment.squads.sort_by_key(|s| s.id);
            }
        }
        CrewAction::ObliterateShift => segment.squads.retain(|s| s.id != squad),
    }
}

/// Maximal runs of `range` not covered by any shift, in clock order from
/// the range start.
fn uncovered_runs(day: &DaySchedule, range: TimeRange) -> Vec<TimeRange> {
    let mut runs = Vec::new();
    let mut open: Option<ClockTime> = None;
    for minute in range.minutes() {
        let covered = day.shifts.iter().any(|s| s.range().contains(minute));
        match (covered, open) {
            (false, None) => open = Some(minute),
            (true, Some(start)) => {
                runs.push(TimeRange::new(start, minute));
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        runs.push(TimeRange::new(start, range.end));
    }
    runs
}

/// Collapses consecutive segments with the same `(id, active)` composition.
fn merge_segments(segments: &mut Vec<ShiftSegment>) {
    let mut merged: Vec<ShiftSegment> = Vec::with_capacity(segments.len());
    for seg in segments.drain(..) {
        match merged.last_mut() {
            Some(prev)
                if prev.composition() == seg.composition() && prev.end_time == seg.start_time =>
            {
                prev.end_time = seg.end_time;
            }
            _ => merged.push(seg),
        }
    }
    *segments = merged;
}
