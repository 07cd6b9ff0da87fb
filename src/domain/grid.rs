//! Fixed 10×4 text grid used for persistence and display.
//!
//! ```text
//! row 0 | "5"                       |            |            |
//! row 1 | "0600-1800\n(Tango: 34)"  | "34\n[34,42,54]" | "35\n[35,43]" |
//! row 2 | "1800-0600\n(Tango: 42)"  | "42\n[All]"      | "43\n[No Crew]" |
//! ...
//! ```
//!
//! Only the first segment of each shift fits in a row. Callers that need
//! every segment preserved lay the day out with
//! [`DaySchedule::into_grid_layout`] first.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::clock::ClockTime;
use super::schedule::{Coverage, DaySchedule, Shift, ShiftSegment, Squad};
use super::squad_id::{SquadId, TerritoryId};
use crate::error::ScheduleError;

/// Rows in a grid, including the header row.
pub const GRID_ROWS: usize = 10;
/// Columns in a grid: time/tango plus three squads.
pub const GRID_COLS: usize = 4;
/// Shift rows available below the header.
pub const MAX_SHIFTS: usize = GRID_ROWS - 1;
/// Squad cells available per row.
pub const MAX_SQUADS: usize = GRID_COLS - 1;

/// Rendered day: [`GRID_ROWS`] rows of [`GRID_COLS`] text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(value_type = Vec<Vec<String>>)]
pub struct Grid([[String; GRID_COLS]; GRID_ROWS]);

impl Grid {
    /// Builds a grid from row vectors.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::GridParse`] unless there are exactly
    /// [`GRID_ROWS`] rows of exactly [`GRID_COLS`] cells.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Result<Self, ScheduleError> {
        if rows.len() != GRID_ROWS {
            return Err(ScheduleError::GridParse(format!(
                "expected {GRID_ROWS} rows, found {}",
                rows.len()
            )));
        }
        let mut grid = Self::default();
        for (index, (target, row)) in grid.0.iter_mut().zip(rows).enumerate() {
            *target = row.try_into().map_err(|row: Vec<String>| {
                ScheduleError::GridParse(format!(
                    "row {index} has {} cells, expected {GRID_COLS}",
                    row.len()
                ))
            })?;
        }
        Ok(grid)
    }

    /// The cell at `(row, col)`, or `""` if out of range.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.0
            .get(row)
            .and_then(|r| r.get(col))
            .map_or("", String::as_str)
    }

    /// Iterates the rows.
    pub fn rows(&self) -> impl Iterator<Item = &[String; GRID_COLS]> {
        self.0.iter()
    }

    fn set(&mut self, row: usize, col: usize, value: String) {
        if let Some(cell) = self.0.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }

    /// Encodes the grid as CSV with RFC 4180 quoting.
    ///
    /// # Errors
    ///
    /// Returns an error if the CSV writer fails.
    pub fn to_csv(&self) -> Result<String, ScheduleError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        for row in &self.0 {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ScheduleError::Internal(format!("csv flush failed: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| ScheduleError::Internal(format!("csv output is not utf-8: {e}")))
    }

    /// Decodes a grid written by [`Self::to_csv`].
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::GridParse`] if the CSV is malformed or has
    /// the wrong shape.
    pub fn from_csv(text: &str) -> Result<Self, ScheduleError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut rows = Vec::with_capacity(GRID_ROWS);
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Self::from_rows(rows)
    }
}

/// Converts between [`DaySchedule`] and [`Grid`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GridFormatter;

impl GridFormatter {
    /// Renders a day.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::GridOverflow`] if the day has more than
    /// [`MAX_SHIFTS`] shifts or a first segment lists more than
    /// [`MAX_SQUADS`] squads.
    pub fn serialize(day: &DaySchedule) -> Result<Grid, ScheduleError> {
        if day.shifts.len() > MAX_SHIFTS {
            return Err(ScheduleError::GridOverflow(format!(
                "{} has {} shifts; the grid holds {MAX_SHIFTS}",
                day.date,
                day.shifts.len()
            )));
        }
        let mut grid = Grid::default();
        grid.set(0, 0, day.day_of_month().to_string());

        for (index, shift) in day.shifts.iter().enumerate() {
            let row = index + 1;
            grid.set(row, 0, time_cell(shift));
            let squads = shift
                .segments
                .first()
                .map(|seg| seg.squads.as_slice())
                .unwrap_or_default();
            if squads.len() > MAX_SQUADS {
                return Err(ScheduleError::GridOverflow(format!(
                    "shift {} lists {} squads; the grid holds {MAX_SQUADS}",
                    shift.range(),
                    squads.len()
                )));
            }
            let mut ordered: Vec<&Squad> = squads.iter().collect();
            ordered.sort_by_key(|squad| squad.id);
            for (offset, squad) in ordered.into_iter().enumerate() {
                grid.set(row, offset + 1, squad_cell(squad));
            }
        }
        Ok(grid)
    }

    /// Parses a grid back into a day.
    ///
    /// The header cell must hold `date`'s day of month. Rows with an empty
    /// time cell are skipped. Each parsed shift has a single segment.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::GridParse`] for any malformed cell.
    pub fn deserialize(grid: &Grid, date: NaiveDate) -> Result<DaySchedule, ScheduleError> {
        let header = grid.cell(0, 0).trim();
        if header.parse::<u32>().ok() != Some(date.day()) {
            return Err(ScheduleError::GridParse(format!(
                "header {header:?} does not match day {} of {date}",
                date.day()
            )));
        }

        let mut day = DaySchedule::new(date);
        for (row, cells) in grid.rows().enumerate().skip(1) {
            let [time, squad_cells @ ..] = cells;
            if time.trim().is_empty() {
                if squad_cells.iter().any(|c| !c.trim().is_empty()) {
                    return Err(ScheduleError::GridParse(format!(
                        "row {row} lists squads without a time range"
                    )));
                }
                continue;
            }
            let (start, end, tango) = parse_time_cell(time)?;
            let squads = squad_cells
                .iter()
                .filter(|c| !c.trim().is_empty())
                .map(|c| parse_squad_cell(c))
                .collect::<Result<Vec<_>, _>>()?;
            let mut shift =
                Shift::with_segments(start, end, vec![ShiftSegment::new(start, end, squads)]);
            shift.tango = tango;
            day.shifts.push(shift);
        }
        Ok(day)
    }
}

fn time_cell(shift: &Shift) -> String {
    let range = shift.range();
    match shift.tango {
        Some(tango) => format!("{range}\n(Tango: {tango})"),
        None => range.to_string(),
    }
}

fn squad_cell(squad: &Squad) -> String {
    let territories = if !squad.active {
        "No Crew".to_string()
    } else {
        match &squad.territories {
            Coverage::All => "All".to_string(),
            Coverage::Listed(set) => set
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    };
    format!("{}\n[{territories}]", squad.id)
}

fn parse_time_cell(cell: &str) -> Result<(ClockTime, ClockTime, Option<SquadId>), ScheduleError> {
    let bad = || ScheduleError::GridParse(format!("malformed time cell {cell:?}"));
    let mut lines = cell.lines();
    let range = lines.next().ok_or_else(bad)?;
    // "HHMM-HHMM" and the older "HHMM - HHMM" both appear in stored grids.
    let (start, end) = range.split_once('-').ok_or_else(bad)?;
    let start = ClockTime::parse_hhmm(start).map_err(|_| bad())?;
    let end = ClockTime::parse_hhmm(end).map_err(|_| bad())?;

    let tango = match lines.next().map(str::trim) {
        None | Some("") => None,
        Some(line) => {
            let id = line
                .strip_prefix("(Tango:")
                .and_then(|rest| rest.strip_suffix(')'))
                .ok_or_else(bad)?;
            Some(id.parse::<SquadId>().map_err(|_| bad())?)
        }
    };
    if lines.next().is_some() {
        return Err(bad());
    }
    Ok((start, end, tango))
}

fn parse_squad_cell(cell: &str) -> Result<Squad, ScheduleError> {
    let bad = || ScheduleError::GridParse(format!("malformed squad cell {cell:?}"));
    let (id, rest) = cell.split_once('\n').ok_or_else(bad)?;
    let id = id.parse::<SquadId>().map_err(|_| bad())?;
    let inner = rest
        .trim()
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .ok_or_else(bad)?
        .trim();

    let squad = match inner {
        "No Crew" => Squad::no_crew(id),
        "All" => Squad {
            id,
            territories: Coverage::All,
            active: true,
        },
        "" => Squad::active(id),
        list => {
            let set = list
                .split(',')
                .map(|t| t.trim().parse::<u16>().map(TerritoryId::new))
                .collect::<Result<BTreeSet<_>, _>>()
                .map_err(|_| bad())?;
            Squad {
                id,
                territories: Coverage::Listed(set),
                active: true,
            }
        }
    };
    Ok(squad)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::mutation::MutationEngine;
    use crate::domain::territory::{TerritoryResolver, TerritoryTable};

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

    fn set_cell(rows: &mut [Vec<String>], row: usize, col: usize, value: &str) {
        if let Some(cell) = rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value.to_string();
        }
    }

    fn sample_day() -> DaySchedule {
        let mut day = DaySchedule::new(date());
        day.shifts.push(Shift::single(
            t("0600"),
            t("1800"),
            vec![Squad::active(SquadId::new(34)), Squad::active(SquadId::new(35))],
        ));
        day.shifts.push(Shift::single(
            t("1800"),
            t("0600"),
            vec![Squad::active(SquadId::new(42)), Squad::no_crew(SquadId::new(43))],
        ));
        let Ok(table) = TerritoryTable::station_default() else {
            panic!("built-in table must validate");
        };
        let engine = MutationEngine::new(TerritoryResolver::new(table));
        let Ok(()) = engine.rederive(&mut day, None) else {
            panic!("sample day should resolve");
        };
        day
    }

    #[test]
    fn renders_expected_cells() {
        let Ok(grid) = GridFormatter::serialize(&sample_day()) else {
            panic!("sample day should render");
        };
        assert_eq!(grid.cell(0, 0), "5");
        assert_eq!(grid.cell(0, 1), "");
        assert_eq!(grid.cell(1, 0), "0600-1800\n(Tango: 34)");
        assert_eq!(grid.cell(1, 1), "34\n[34,42,54]");
        assert_eq!(grid.cell(1, 2), "35\n[35,43]");
        assert_eq!(grid.cell(2, 0), "1800-0600\n(Tango: 42)");
        assert_eq!(grid.cell(2, 1), "42\n[All]");
        assert_eq!(grid.cell(2, 2), "43\n[No Crew]");
        assert_eq!(grid.cell(3, 0), "");
    }

    #[test]
    fn round_trips_single_segment_days() {
        let day = sample_day();
        let Ok(grid) = GridFormatter::serialize(&day) else {
            panic!("sample day should render");
        };
        let Ok(parsed) = GridFormatter::deserialize(&grid, date()) else {
            panic!("rendered grid should parse");
        };
        assert_eq!(parsed, day);
    }

    fn assert_round_trip(day: &DaySchedule) {
        let Ok(grid) = GridFormatter::serialize(day) else {
            panic!("day should render");
        };
        let Ok(parsed) = GridFormatter::deserialize(&grid, day.date) else {
            panic!("rendered grid should parse");
        };
        assert_eq!(&parsed, day);
    }

    #[test]
    fn round_trips_empty_day() {
        assert_round_trip(&DaySchedule::new(date()));
    }

    #[test]
    fn round_trips_full_grid_of_hourly_shifts() {
        let mut day = DaySchedule::new(date());
        for hour in 0..9_u16 {
            let id = SquadId::new(if hour % 2 == 0 { 34 } else { 54 });
            let mut shift = Shift::single(
                ClockTime::from_minutes((6 + hour) * 60),
                ClockTime::from_minutes((7 + hour) * 60),
                vec![Squad {
                    id,
                    territories: Coverage::All,
                    active: true,
                }],
            );
            shift.tango = Some(id);
            day.shifts.push(shift);
        }
        assert_eq!(day.shifts.len(), MAX_SHIFTS);
        assert_round_trip(&day);
    }

    #[test]
    fn round_trips_vacant_shift_and_unresolved_squad() {
        let mut day = DaySchedule::new(date());
        day.shifts.push(Shift::single(t("0600"), t("1800"), vec![]));
        day.shifts
            .push(Shift::single(t("1800"), t("0600"), vec![Squad::active(SquadId::new(43))]));
        let Ok(grid) = GridFormatter::serialize(&day) else {
            panic!("day should render");
        };
        assert_eq!(grid.cell(1, 1), "");
        assert_eq!(grid.cell(2, 1), "43\n[]");
        assert_round_trip(&day);
    }

    #[test]
    fn round_trips_wrapping_and_full_day_shifts() {
        let mut wrapping = DaySchedule::new(date());
        wrapping.shifts.push(Shift::single(
            t("2200"),
            t("0200"),
            vec![Squad::active(SquadId::new(42)), Squad::no_crew(SquadId::new(43))],
        ));
        assert_round_trip(&wrapping);

        let mut full = DaySchedule::new(date());
        let mut shift = Shift::single(
            t("0600"),
            t("0600"),
            vec![Squad {
                id: SquadId::new(35),
                territories: Coverage::All,
                active: true,
            }],
        );
        shift.tango = Some(SquadId::new(35));
        full.shifts.push(shift);
        let Ok(grid) = GridFormatter::serialize(&full) else {
            panic!("day should render");
        };
        assert_eq!(grid.cell(1, 0), "0600-0600\n(Tango: 35)");
        assert_round_trip(&full);
    }

    #[test]
    fn renders_squads_in_id_order() {
        let mut day = DaySchedule::new(date());
        day.shifts.push(Shift::with_segments(
            t("0600"),
            t("1800"),
            vec![ShiftSegment {
                start_time: t("0600"),
                end_time: t("1800"),
                squads: vec![Squad::no_crew(SquadId::new(54)), Squad::active(SquadId::new(34))],
            }],
        ));
        let Ok(grid) = GridFormatter::serialize(&day) else {
            panic!("day should render");
        };
        assert_eq!(grid.cell(1, 1), "34\n[]");
        assert_eq!(grid.cell(1, 2), "54\n[No Crew]");
    }

    #[test]
    fn csv_round_trip_is_exact() {
        let Ok(grid) = GridFormatter::serialize(&sample_day()) else {
            panic!("sample day should render");
        };
        let Ok(csv) = grid.to_csv() else {
            panic!("grid should encode");
        };
        let Ok(back) = Grid::from_csv(&csv) else {
            panic!("csv should decode");
        };
        assert_eq!(back, grid);
    }

    #[test]
    fn accepts_legacy_time_spelling() {
        let mut rows = vec![vec![String::new(); GRID_COLS]; GRID_ROWS];
        set_cell(&mut rows, 0, 0, "5");
        set_cell(&mut rows, 1, 0, "1800 - 0600");
        set_cell(&mut rows, 1, 1, "54\n[All]");
        let Ok(grid) = Grid::from_rows(rows) else {
            panic!("grid shape is valid");
        };
        let Ok(day) = GridFormatter::deserialize(&grid, date()) else {
            panic!("legacy spelling should parse");
        };
        let Some(shift) = day.shifts.first() else {
            panic!("one shift expected");
        };
        assert_eq!(shift.name, "Night Shift");
        assert_eq!(shift.tango, None);
    }

    #[test]
    fn too_many_shifts_overflow() {
        let mut day = DaySchedule::new(date());
        for hour in 0..10_u16 {
            day.shifts.push(Shift::single(
                ClockTime::from_minutes((6 + hour) * 60),
                ClockTime::from_minutes((7 + hour) * 60),
                vec![],
            ));
        }
        assert!(matches!(
            GridFormatter::serialize(&day),
            Err(ScheduleError::GridOverflow(_))
        ));
    }

    #[test]
    fn too_many_squads_overflow() {
        let mut day = DaySchedule::new(date());
        day.shifts.push(Shift::single(
            t("0600"),
            t("1800"),
            [34, 35, 42, 43]
                .iter()
                .map(|id| Squad::active(SquadId::new(*id)))
                .collect(),
        ));
        assert!(matches!(
            GridFormatter::serialize(&day),
            Err(ScheduleError::GridOverflow(_))
        ));
    }

    #[test]
    fn rejects_malformed_cells() {
        let Ok(grid) = GridFormatter::serialize(&sample_day()) else {
            panic!("sample day should render");
        };
        let mut rows: Vec<Vec<String>> = grid.rows().map(|r| r.to_vec()).collect();
        set_cell(&mut rows, 1, 1, "34 [All]");
        let Ok(broken) = Grid::from_rows(rows) else {
            panic!("grid shape is valid");
        };
        assert!(matches!(
            GridFormatter::deserialize(&broken, date()),
            Err(ScheduleError::GridParse(_))
        ));
    }

    #[test]
    fn rejects_wrong_header_day() {
        let Ok(grid) = GridFormatter::serialize(&sample_day()) else {
            panic!("sample day should render");
        };
        let Some(other) = NaiveDate::from_ymd_opt(2026, 1, 6) else {
            panic!("valid date");
        };
        assert!(GridFormatter::deserialize(&grid, other).is_err());
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(Grid::from_rows(vec![vec![String::new(); GRID_COLS]; 3]).is_err());
        assert!(Grid::from_csv("5,,\n").is_err());
    }
}
