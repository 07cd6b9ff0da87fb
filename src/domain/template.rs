//! Rotating week templates and month generation.
//!
//! A template is a CSV sheet with one header row followed by rows of
//!
//! ```text
//! week1,0600 - 1800,34|35,1800 - 0600,42|43,...
//! ```
//!
//! i.e. a week label and then a `(range, squads)` column pair for each day
//! from Sunday to Saturday. A week may span several rows, one per shift.
//!
//! Months are generated by walking the calendar and picking the template
//! week that is current for each date. The rotation continues across
//! months: the first week used in a month is the number of ISO weeks
//! spanned by the earlier months of the year, modulo the template length.
//! The week advances every Sunday.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use utoipa::ToSchema;

use super::clock::{ClockTime, TimeRange};
use super::schedule::{DaySchedule, Shift, ShiftSegment, Squad};
use super::squad_id::SquadId;
use super::tango::TangoSelector;
use super::territory::TerritoryResolver;
use crate::error::ScheduleError;

const DAYS_PER_WEEK: usize = 7;

/// A shift as written in the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateShift {
    /// Shift range.
    pub range: TimeRange,
    /// Squads on duty, as listed.
    pub squads: Vec<SquadId>,
}

/// Parsed week template: for each week number, the shifts of each weekday
/// indexed from Sunday.
#[derive(Debug, Clone, Default)]
pub struct ShiftTemplate {
    weeks: BTreeMap<u32, [Vec<TemplateShift>; DAYS_PER_WEEK]>,
}

impl ShiftTemplate {
    /// Parses template CSV text.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRequest`] if a cell is malformed or
    /// the sheet defines no weeks.
    pub fn parse(text: &str) -> Result<Self, ScheduleError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut template = Self::default();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let Some(label) = record.get(0).map(str::trim) else {
                continue;
            };
            let Some(number) = label.strip_prefix("week") else {
                continue;
            };
            let week: u32 = number.trim().parse().map_err(|_| {
                ScheduleError::InvalidRequest(format!(
                    "template row {}: bad week label {label:?}",
                    line + 2
                ))
            })?;
            let days = template.weeks.entry(week).or_default();

            for (day_index, day) in days.iter_mut().enumerate() {
                let column = 1 + day_index * 2;
                let range = record.get(column).map_or("", str::trim);
                let squads = record.get(column + 1).map_or("", str::trim);
                if range.is_empty() || squads.is_empty() {
                    continue;
                }
                day.push(TemplateShift {
                    range: parse_template_range(range)?,
                    squads: parse_template_squads(squads)?,
                });
            }
        }

        if template.weeks.is_empty() {
            return Err(ScheduleError::InvalidRequest(
                "template defines no weeks".to_string(),
            ));
        }
        Ok(template)
    }

    /// Highest week number in the template.
    #[must_use]
    pub fn week_count(&self) -> u32 {
        self.weeks.keys().next_back().copied().unwrap_or(0)
    }

    /// Shifts listed for `weekday` of template week `week`.
    #[must_use]
    pub fn shifts_for(&self, week: u32, weekday: Weekday) -> &[TemplateShift] {
        let index = weekday.num_days_from_sunday() as usize;
        self.weeks
            .get(&week)
            .and_then(|days| days.get(index))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Template week in effect on the first day of a month.
    #[must_use]
    pub fn starting_week(&self, month: YearMonth) -> u32 {
        let count = self.week_count();
        if count == 0 {
            return 1;
        }
        let spanned: u32 = (1..month.month)
            .filter_map(|m| YearMonth::new(month.year, m).ok())
            .map(YearMonth::iso_weeks_spanned)
            .sum();
        spanned % count + 1
    }

    /// Builds one day from template shifts, before territories and tango
    /// are assigned.
    ///
    /// A Monday night shift (18:00–06:00) is split at midnight into two
    /// segments.
    #[must_use]
    pub fn build_day(&self, week: u32, date: NaiveDate) -> DaySchedule {
        let weekday = date.weekday();
        let mut day = DaySchedule::new(date);
        for entry in self.shifts_for(week, weekday) {
            let squads: Vec<Squad> = entry.squads.iter().copied().map(Squad::active).collect();
            let (start, end) = (entry.range.start, entry.range.end);
            let shift = if weekday == Weekday::Mon && is_night(entry.range) {
                Shift::with_segments(
                    start,
                    end,
                    vec![
                        ShiftSegment::new(start, ClockTime::MIDNIGHT, squads.clone()),
                        ShiftSegment::new(ClockTime::MIDNIGHT, end, squads),
                    ],
                )
            } else {
                Shift::single(start, end, squads)
            };
            day.shifts.push(shift);
        }
        day.sort_shifts();
        day
    }

    /// Generates every day of `month`, with territories resolved and tango
    /// rotating across the whole month from `prior_tango`.
    ///
    /// Template segments are kept as authored; they are not merged.
    ///
    /// # Errors
    ///
    /// Propagates [`ScheduleError::UnknownCombination`] from the resolver.
    pub fn generate_month(
        &self,
        month: YearMonth,
        resolver: &TerritoryResolver,
        prior_tango: Option<SquadId>,
    ) -> Result<Vec<DaySchedule>, ScheduleError> {
        let count = self.week_count().max(1);
        let mut week = self.starting_week(month);
        let mut tango = prior_tango;
        let mut days = Vec::new();

        for date in month.days() {
            let mut day = self.build_day(week, date);
            resolver.assign_day(&mut day)?;
            tango = TangoSelector::assign(&mut day.shifts, tango);
            days.push(day);

            if date.succ_opt().is_some_and(|next| next.weekday() == Weekday::Sun) {
                week = week % count + 1;
            }
        }
        Ok(days)
    }
}

fn is_night(range: TimeRange) -> bool {
    range.start.hhmm() == "1800" && range.end.hhmm() == "0600"
}

fn parse_template_range(text: &str) -> Result<TimeRange, ScheduleError> {
    let (start, end) = text
        .split_once('-')
        .ok_or_else(|| ScheduleError::InvalidRequest(format!("bad template range {text:?}")))?;
    Ok(TimeRange::new(
        ClockTime::parse_hhmm(start)?,
        ClockTime::parse_hhmm(end)?,
    ))
}

fn parse_template_squads(text: &str) -> Result<Vec<SquadId>, ScheduleError> {
    text.split('|')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMonth {
    /// Year.
    pub year: i32,
    /// Month, 1–12.
    pub month: u32,
}

impl YearMonth {
    /// Creates a month.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRequest`] if `month` is not 1–12.
    pub fn new(year: i32, month: u32) -> Result<Self, ScheduleError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|_| Self { year, month })
            .ok_or_else(|| ScheduleError::InvalidRequest(format!("invalid month {year}-{month}")))
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    /// Last day of the month.
    #[must_use]
    pub fn last_day(self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|next| next.pred_opt())
            .unwrap_or_default()
    }

    /// Every date of the month in order.
    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        let last = self.last_day();
        self.first_day().iter_days().take_while(move |d| *d <= last)
    }

    /// Number of ISO weeks the month touches.
    #[must_use]
    pub fn iso_weeks_spanned(self) -> u32 {
        let first = self.first_day().iso_week().week();
        let last = self.last_day().iso_week().week();
        if last < first {
            // First days belong to the last ISO week of the previous year.
            53 + last - first
        } else {
            last - first + 1
        }
    }
}

impl FromStr for YearMonth {
    type Err = ScheduleError;

    /// Parses `YYYYMM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || ScheduleError::InvalidRequest(format!("invalid month {s:?}, expected YYYYMM"));
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let (year, month) = s.split_at(4);
        Self::new(year.parse().map_err(|_| bad())?, month.parse().map_err(|_| bad())?)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

/// Coverage totals for a run of days.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct ScheduleStatistics {
    /// On-duty hours per squad.
    #[schema(value_type = Object)]
    pub hours_by_squad: BTreeMap<SquadId, f64>,
    /// Hours spent as tango per squad.
    #[schema(value_type = Object)]
    pub tango_hours_by_squad: BTreeMap<SquadId, f64>,
    /// Shifts with exactly one active squad.
    pub single_squad_shifts: usize,
}

impl ScheduleStatistics {
    /// Accumulates statistics over `days`.
    #[must_use]
    pub fn collect(days: &[DaySchedule]) -> Self {
        let mut stats = Self::default();
        for shift in days.iter().flat_map(|d| d.shifts.iter()) {
            for segment in &shift.segments {
                let hours = f64::from(segment.range().len_minutes()) / 60.0;
                for id in segment.active_ids() {
                    *stats.hours_by_squad.entry(id).or_default() += hours;
                }
            }
            if shift.active_ids().len() == 1 {
                stats.single_squad_shifts += 1;
            }
            if let Some(tango) = shift.tango {
                *stats.tango_hours_by_squad.entry(tango).or_default() += shift.hours();
            }
        }
        stats
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::schedule::Coverage;
    use crate::domain::territory::TerritoryTable;

    const SHEET: &str = "\
,sunday,,monday,,tuesday,,wed,,thurs,,fri,,sat,
week1,0600 - 1800,34|35,0600 - 1800,42|43,0600 - 1800,54,0600 - 1800,34,0600 - 1800,35,0600 - 1800,42,0600 - 1800,43
week1,1800 - 0600,42|43,1800 - 0600,34|54,,,,,,,,,,
week2,0600 - 1800,54,0600 - 1800,35|54,,,,,,,,,,
";

    fn template() -> ShiftTemplate {
        let Ok(template) = ShiftTemplate::parse(SHEET) else {
            panic!("sample sheet should parse");
        };
        template
    }

    fn resolver() -> TerritoryResolver {
        let Ok(table) = TerritoryTable::station_default() else {
            panic!("built-in table must validate");
        };
        TerritoryResolver::new(table)
    }

    fn month(text: &str) -> YearMonth {
        let Ok(month) = text.parse() else {
            panic!("valid month {text}");
        };
        month
    }

    #[test]
    fn parses_weeks_and_days() {
        let t = template();
        assert_eq!(t.week_count(), 2);
        assert_eq!(t.shifts_for(1, Weekday::Sun).len(), 2);
        assert_eq!(t.shifts_for(1, Weekday::Sat).len(), 1);
        assert_eq!(t.shifts_for(2, Weekday::Tue).len(), 0);
        let Some(monday_night) = t.shifts_for(1, Weekday::Mon).get(1) else {
            panic!("monday night expected");
        };
        assert_eq!(monday_night.squads, vec![SquadId::new(34), SquadId::new(54)]);
    }

    #[test]
    fn rejects_bad_cells() {
        assert!(ShiftTemplate::parse(",sunday,\nweek1,1800 to 0600,34\n").is_err());
        assert!(ShiftTemplate::parse(",sunday,\nweek1,1800 - 0600,34|x\n").is_err());
        assert!(ShiftTemplate::parse(",sunday,\n").is_err());
    }

    #[test]
    fn monday_night_is_split_at_midnight() {
        let Some(monday) = NaiveDate::from_ymd_opt(2026, 1, 5) else {
            panic!("valid date");
        };
        let day = template().build_day(1, monday);
        let Some(night) = day.shifts.get(1) else {
            panic!("night shift expected");
        };
        assert_eq!(night.segments.len(), 2);
        assert!(day.is_well_formed());
    }

    #[test]
    fn month_helpers() {
        let feb = month("202602");
        assert_eq!(feb.days().count(), 28);
        assert_eq!(feb.to_string(), "202602");
        assert!("202613".parse::<YearMonth>().is_err());
        assert!("2026-1".parse::<YearMonth>().is_err());
        // 2027-01-01 is a Friday in ISO week 53 of 2026.
        assert_eq!(month("202701").iso_weeks_spanned(), 4);
        assert_eq!(month("202601").iso_weeks_spanned(), 5);
    }

    #[test]
    fn starting_week_rolls_across_months() {
        let t = template();
        assert_eq!(t.starting_week(month("202601")), 1);
        // January 2026 touches five ISO weeks.
        assert_eq!(t.starting_week(month("202602")), 2);
    }

    #[test]
    fn generates_month_with_rotation() {
        let Ok(days) = template().generate_month(month("202601"), &resolver(), None) else {
            panic!("month should generate");
        };
        assert_eq!(days.len(), 31);

        // 2026-01-04 is the first Sunday; the week flips to 2 there.
        let Some(sunday) = days.get(3) else {
            panic!("day 4 expected");
        };
        assert_eq!(sunday.shifts.len(), 1);
        let Some(only) = sunday.shifts.first().and_then(|s| s.segments.first()) else {
            panic!("segment expected");
        };
        assert_eq!(
            only.squad(SquadId::new(54)).map(|s| s.territories.clone()),
            Some(Coverage::All)
        );
        assert!(days.iter().all(DaySchedule::is_well_formed));
    }

    #[test]
    fn statistics_count_hours_and_single_squads() {
        let Ok(days) = template().generate_month(month("202601"), &resolver(), None) else {
            panic!("month should generate");
        };
        let Some(first) = days.first() else {
            panic!("first day expected");
        };
        // 2026-01-01 is a Thursday: a single 12 hour shift for squad 35.
        let stats = ScheduleStatistics::collect(std::slice::from_ref(first));
        assert_eq!(stats.hours_by_squad.get(&SquadId::new(35)), Some(&12.0));
        assert_eq!(stats.tango_hours_by_squad.get(&SquadId::new(35)), Some(&12.0));
        assert_eq!(stats.single_squad_shifts, 1);
    }
}
