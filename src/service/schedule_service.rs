//! Schedule service: runs commands against stored day grids.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    ActionKind, Command, DayLocks, DaySchedule, Grid, GridFormatter, MutationEngine,
    ScheduleStatistics, SegmentCommand, ShiftTemplate, SnapshotId, SquadId, TangoSelector,
    YearMonth, format_date,
};
use crate::error::ScheduleError;
use crate::persistence::{GridStore, SnapshotSummary};

use super::BackupCoordinator;

/// Result of a command, ready to be rendered as a response.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Canonical action name.
    pub action: String,
    /// Target day.
    pub date: NaiveDate,
    /// Current grid (before the change, for previews).
    pub grid: Option<Grid>,
    /// Grid after the change, for previews.
    pub modified_grid: Option<Grid>,
    /// Snapshot taken before the change, or restored by a revert.
    pub change_id: Option<SnapshotId>,
    /// Whether the command only previewed its result.
    pub preview: Option<bool>,
    /// Snapshot listing.
    pub snapshots: Option<Vec<SnapshotSummary>>,
}

impl CommandOutcome {
    fn new(action: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            action: action.into(),
            date,
            grid: None,
            modified_grid: None,
            change_id: None,
            preview: None,
            snapshots: None,
        }
    }
}

/// Summary of a month generation run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MonthReport {
    /// Month in `YYYYMM` form.
    pub month: String,
    /// Template week the month started on.
    pub starting_week: u32,
    /// Days written to the grid store.
    pub days_written: usize,
    /// Existing days left untouched.
    pub days_skipped: usize,
    /// Snapshots taken of overwritten days.
    pub snapshots: Vec<SnapshotId>,
    /// Coverage statistics for the generated month.
    pub statistics: ScheduleStatistics,
}

/// Orchestration layer for every schedule command.
///
/// Owns the grid store, the backup coordinator and the mutation engine.
/// Every write follows the pattern: acquire the day lock → read grid →
/// mutate → snapshot the old grid → write the new grid.
#[derive(Debug)]
pub struct ScheduleService {
    grids: Arc<dyn GridStore>,
    backups: BackupCoordinator,
    engine: MutationEngine,
    locks: DayLocks,
}

impl ScheduleService {
    /// Creates a new `ScheduleService`.
    #[must_use]
    pub fn new(
        grids: Arc<dyn GridStore>,
        backups: BackupCoordinator,
        engine: MutationEngine,
    ) -> Self {
        Self {
            grids,
            backups,
            engine,
            locks: DayLocks::new(),
        }
    }

    /// Returns the mutation engine.
    #[must_use]
    pub fn engine(&self) -> &MutationEngine {
        &self.engine
    }

    /// Returns the backup coordinator.
    #[must_use]
    pub fn backups(&self) -> &BackupCoordinator {
        &self.backups
    }

    /// Runs a validated command.
    ///
    /// # Errors
    ///
    /// Returns the [`ScheduleError`] of whichever step failed.
    pub async fn execute(&self, command: Command) -> Result<CommandOutcome, ScheduleError> {
        let kind = command.kind();
        let date = command.date();
        let result = match command {
            Command::Mutate { command, preview } => self.mutate(&command, preview).await,
            Command::GetCurrent { date } => self.get_current(date).await,
            Command::Revert { date, snapshot } => self.revert(date, snapshot).await,
            Command::ListSnapshots { date } => self.list_snapshots(date).await,
        };
        if let Err(err) = &result {
            tracing::warn!(
                action = %kind,
                %date,
                code = err.error_code(),
                error = %err,
                "command rejected"
            );
        }
        result
    }

    /// Returns the stored grid of `date`.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::DayNotFound`] if nothing is stored.
    pub async fn current_grid(&self, date: NaiveDate) -> Result<Grid, ScheduleError> {
        self.grids
            .get_day(date)
            .await?
            .ok_or(ScheduleError::DayNotFound(date))
    }

    async fn get_current(&self, date: NaiveDate) -> Result<CommandOutcome, ScheduleError> {
        let mut outcome = CommandOutcome::new(ActionKind::GetCurrent.as_str(), date);
        outcome.grid = Some(self.current_grid(date).await?);
        Ok(outcome)
    }

    async fn list_snapshots(&self, date: NaiveDate) -> Result<CommandOutcome, ScheduleError> {
        let mut outcome = CommandOutcome::new(ActionKind::ListSnapshots.as_str(), date);
        outcome.snapshots = Some(self.backups.list(date).await?);
        Ok(outcome)
    }

    /// Returns the stored day of `date` as a schedule.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::DayNotFound`] if nothing is stored and
    /// [`ScheduleError::GridParse`] if the stored grid is malformed.
    pub async fn current_day(&self, date: NaiveDate) -> Result<DaySchedule, ScheduleError> {
        let grid = self.current_grid(date).await?;
        GridFormatter::deserialize(&grid, date)
    }

    /// Final tango of the day before `date`, if that day is stored.
    ///
    /// # Errors
    ///
    /// Propagates grid store failures. An unreadable prior grid is logged
    /// and treated as absent.
    pub async fn prior_tango(&self, date: NaiveDate) -> Result<Option<SquadId>, ScheduleError> {
        let Some(previous) = date.pred_opt() else {
            return Ok(None);
        };
        let Some(grid) = self.grids.get_day(previous).await? else {
            return Ok(None);
        };
        match GridFormatter::deserialize(&grid, previous) {
            Ok(day) => Ok(day.final_tango()),
            Err(err) => {
                tracing::warn!(
                    day = %previous,
                    error = %err,
                    "prior day grid unreadable, tango rotation restarts"
                );
                Ok(None)
            }
        }
    }

    /// Applies a segment mutation, or previews it.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::DayNotFound`] if the day is not stored,
    /// plus any engine, grid or store error.
    pub async fn mutate(
        &self,
        command: &SegmentCommand,
        preview: bool,
    ) -> Result<CommandOutcome, ScheduleError> {
        let date = command.date;
        let _guard = if preview {
            None
        } else {
            Some(self.locks.acquire(date).await)
        };

        let original = self.current_grid(date).await?;
        let mut day = GridFormatter::deserialize(&original, date)?.coalesce_rows();
        let prior = self.prior_tango(date).await?;
        let report = self.engine.apply(&mut day, command, prior)?;
        let modified = render(day, prior)?;

        let mut outcome = CommandOutcome::new(command.action.as_str(), date);
        outcome.preview = Some(preview);
        if preview {
            tracing::debug!(
                action = %command.action,
                %date,
                squad = %command.squad,
                range = %command.range,
                "command previewed"
            );
            outcome.grid = Some(original);
            outcome.modified_grid = Some(modified);
            return Ok(outcome);
        }

        let change_id = self
            .backups
            .save(date, &original, &command.describe(), &command.audit_string())
            .await?;
        self.grids.put_day(date, &modified).await?;

        tracing::info!(
            action = %command.action,
            %date,
            squad = %command.squad,
            range = %command.range,
            segments_touched = report.segments_touched,
            shifts_created = report.shifts_created,
            shifts_removed = report.shifts_removed,
            change_id = ?change_id,
            "command applied"
        );
        outcome.grid = Some(modified);
        outcome.change_id = change_id;
        Ok(outcome)
    }

    /// Restores `date` from snapshot `id`.
    ///
    /// The stored grid is written back exactly as saved. No snapshot is
    /// created or deleted, so reverting twice gives the same result.
    ///
    /// # Errors
    ///
    /// - [`ScheduleError::BackupUnavailable`] when backups are disabled.
    /// - [`ScheduleError::SnapshotNotFound`] for an unknown ID.
    /// - [`ScheduleError::InvalidRequest`] if the snapshot belongs to
    ///   another day.
    pub async fn revert(
        &self,
        date: NaiveDate,
        id: SnapshotId,
    ) -> Result<CommandOutcome, ScheduleError> {
        let _guard = self.locks.acquire(date).await;
        let (snapshot, grid) = self.backups.revert(id).await?;
        if snapshot.day != date {
            return Err(ScheduleError::InvalidRequest(format!(
                "snapshot {id} belongs to {}, not {date}",
                snapshot.day
            )));
        }
        GridFormatter::deserialize(&grid, date)?;
        self.grids.put_day(date, &grid).await?;

        tracing::info!(
            %date,
            snapshot_id = %id,
            description = %snapshot.description,
            "day reverted"
        );
        let mut outcome = CommandOutcome::new(ActionKind::Revert.as_str(), date);
        outcome.grid = Some(grid);
        outcome.change_id = Some(id);
        Ok(outcome)
    }

    /// Replaces a whole day with a schedule supplied by the caller.
    ///
    /// The schedule is normalized first (sorted squads, merged segments,
    /// re-derived territories and tango). When not previewing, the
    /// existing grid, if any, is snapshotted before being overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRequest`] if the schedule is for
    /// another day or is not well formed, plus any engine, grid or store
    /// error.
    pub async fn apply_external(
        &self,
        date: NaiveDate,
        mut day: DaySchedule,
        preview: bool,
    ) -> Result<CommandOutcome, ScheduleError> {
        if day.date != date {
            return Err(ScheduleError::InvalidRequest(format!(
                "schedule is for {}, not {date}",
                day.date
            )));
        }
        let _guard = if preview {
            None
        } else {
            Some(self.locks.acquire(date).await)
        };

        let prior = self.prior_tango(date).await?;
        self.engine.normalize(&mut day, prior)?;
        let modified = render(day, prior)?;
        let existing = self.grids.get_day(date).await?;

        let mut outcome = CommandOutcome::new("apply", date);
        outcome.preview = Some(preview);
        if preview {
            outcome.grid = existing;
            outcome.modified_grid = Some(modified);
            return Ok(outcome);
        }

        if let Some(existing) = &existing {
            outcome.change_id = self
                .backups
                .save(
                    date,
                    existing,
                    "apply - external schedule",
                    &format!("action=apply&date={}", format_date(date)),
                )
                .await?;
        }
        self.grids.put_day(date, &modified).await?;
        tracing::info!(%date, change_id = ?outcome.change_id, "external schedule applied");
        outcome.grid = Some(modified);
        Ok(outcome)
    }

    /// Generates a month from a CSV template and writes it to the grid
    /// store.
    ///
    /// Existing days are kept unless `overwrite` is set, in which case
    /// each one is snapshotted before being replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRequest`] for a malformed template,
    /// plus any resolver, grid or store error. Days written before a
    /// failure stay written.
    pub async fn generate_month(
        &self,
        template_csv: &str,
        month: YearMonth,
        overwrite: bool,
    ) -> Result<MonthReport, ScheduleError> {
        let template = ShiftTemplate::parse(template_csv)?;
        let starting_week = template.starting_week(month);
        let mut tango = self.prior_tango(month.first_day()).await?;
        let generated = template.generate_month(month, self.engine.resolver(), tango)?;

        let mut laid_out = Vec::with_capacity(generated.len());
        for day in generated {
            let mut day = day.into_grid_layout();
            tango = TangoSelector::assign(&mut day.shifts, tango);
            laid_out.push(day);
        }

        let mut report = MonthReport {
            month: month.to_string(),
            starting_week,
            days_written: 0,
            days_skipped: 0,
            snapshots: Vec::new(),
            statistics: ScheduleStatistics::collect(&laid_out),
        };

        for day in &laid_out {
            let grid = GridFormatter::serialize(day)?;
            let _guard = self.locks.acquire(day.date).await;
            if let Some(existing) = self.grids.get_day(day.date).await? {
                if !overwrite {
                    report.days_skipped += 1;
                    continue;
                }
                let saved = self
                    .backups
                    .save(
                        day.date,
                        &existing,
                        &format!("generate - month {month}"),
                        &format!("action=generate&month={month}&overwrite=true"),
                    )
                    .await?;
                report.snapshots.extend(saved);
            }
            self.grids.put_day(day.date, &grid).await?;
            report.days_written += 1;
        }

        tracing::info!(
            %month,
            starting_week,
            days_written = report.days_written,
            days_skipped = report.days_skipped,
            "month generated"
        );
        Ok(report)
    }

    /// Deletes expired snapshots.
    ///
    /// # Errors
    ///
    /// Propagates snapshot store failures.
    pub async fn expire_snapshots(&self) -> Result<u64, ScheduleError> {
        self.backups.expire().await
    }
}

/// Lays a day out one segment per row, re-runs tango and renders it.
fn render(day: DaySchedule, prior: Option<SquadId>) -> Result<Grid, ScheduleError> {
    let mut laid_out = day.into_grid_layout();
    TangoSelector::assign(&mut laid_out.shifts, prior);
    GridFormatter::serialize(&laid_out)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::{
        ClockTime, CrewAction, Shift, Squad, TerritoryResolver, TerritoryTable, TimeRange,
    };
    use crate::persistence::{MemoryGridStore, MemorySnapshotStore};

    fn date(d: u32) -> NaiveDate {
        let Some(date) = NaiveDate::from_ymd_opt(2026, 1, d) else {
            panic!("valid date");
        };
        date
    }

    fn t(text: &str) -> ClockTime {
        let Ok(time) = ClockTime::parse_hhmm(text) else {
            panic!("bad test time {text}");
        };
        time
    }

    fn engine() -> MutationEngine {
        let Ok(table) = TerritoryTable::station_default() else {
            panic!("built-in table must validate");
        };
        MutationEngine::new(TerritoryResolver::new(table))
    }

    fn service(backups_on: bool) -> ScheduleService {
        let backups = if backups_on {
            BackupCoordinator::enabled(Arc::new(MemorySnapshotStore::new()), Duration::days(30))
        } else {
            BackupCoordinator::Disabled
        };
        ScheduleService::new(Arc::new(MemoryGridStore::new()), backups, engine())
    }

    fn seed_day(d: u32) -> DaySchedule {
        let squads = |ids: &[u16]| ids.iter().map(|id| Squad::active(SquadId::new(*id))).collect();
        let mut day = DaySchedule::new(date(d));
        day.shifts.push(Shift::single(t("0600"), t("1800"), squads(&[34, 35])));
        day.shifts.push(Shift::single(t("1800"), t("0600"), squads(&[42, 43])));
        day
    }

    async fn seeded(backups_on: bool) -> ScheduleService {
        let svc = service(backups_on);
        let Ok(_) = svc.apply_external(date(5), seed_day(5), false).await else {
            panic!("seeding should succeed");
        };
        svc
    }

    fn remove_42(preview: bool) -> Command {
        Command::Mutate {
            command: SegmentCommand {
                date: date(5),
                range: TimeRange::new(t("1900"), t("2100")),
                squad: SquadId::new(42),
                action: CrewAction::RemoveCrew,
            },
            preview,
        }
    }

    fn commit(action: CrewAction, start: &str, end: &str, squad: u16) -> Command {
        Command::Mutate {
            command: SegmentCommand {
                date: date(5),
                range: TimeRange::new(t(start), t(end)),
                squad: SquadId::new(squad),
                action,
            },
            preview: false,
        }
    }

    #[tokio::test]
    async fn preview_does_not_write() {
        let svc = seeded(true).await;
        let Ok(before) = svc.current_grid(date(5)).await else {
            panic!("seeded day should exist");
        };
        let Ok(outcome) = svc.execute(remove_42(true)).await else {
            panic!("preview should succeed");
        };
        assert_eq!(outcome.preview, Some(true));
        assert_eq!(outcome.grid.as_ref(), Some(&before));
        assert!(outcome.modified_grid.is_some_and(|g| g != before));
        assert!(outcome.change_id.is_none());
        assert!(matches!(svc.current_grid(date(5)).await, Ok(g) if g == before));
    }

    #[tokio::test]
    async fn commit_writes_split_rows_and_snapshot() {
        let svc = seeded(true).await;
        let Ok(outcome) = svc.execute(remove_42(false)).await else {
            panic!("commit should succeed");
        };
        assert!(outcome.change_id.is_some());

        let Ok(grid) = svc.current_grid(date(5)).await else {
            panic!("day should exist");
        };
        assert_eq!(grid.cell(2, 0), "1800-1900\n(Tango: 42)");
        assert_eq!(grid.cell(3, 0), "1900-2100\n(Tango: 43)");
        assert_eq!(grid.cell(3, 1), "42\n[No Crew]");
        assert_eq!(grid.cell(3, 2), "43\n[All]");
        assert_eq!(grid.cell(4, 0), "2100-0600\n(Tango: 42)");
    }

    #[tokio::test]
    async fn add_back_restores_seed_grid() {
        let svc = seeded(true).await;
        let Ok(before) = svc.current_grid(date(5)).await else {
            panic!("seeded day should exist");
        };
        let (Ok(_), Ok(_)) = (
            svc.execute(remove_42(false)).await,
            svc.execute(commit(CrewAction::AddShift, "1900", "2100", 42)).await,
        ) else {
            panic!("commands should succeed");
        };
        assert!(matches!(svc.current_grid(date(5)).await, Ok(g) if g == before));
    }

    #[tokio::test]
    async fn repeated_remove_and_add_keeps_night_on_one_row() {
        let svc = seeded(true).await;
        let Ok(before) = svc.current_grid(date(5)).await else {
            panic!("seeded day should exist");
        };
        for _ in 0..5 {
            let (Ok(_), Ok(_)) = (
                svc.execute(remove_42(false)).await,
                svc.execute(commit(CrewAction::AddShift, "1900", "2100", 42)).await,
            ) else {
                panic!("commands should succeed");
            };
        }
        let Ok(grid) = svc.current_grid(date(5)).await else {
            panic!("day should exist");
        };
        assert_eq!(grid.cell(2, 0), "1800-0600\n(Tango: 42)");
        assert_eq!(grid.cell(3, 0), "");
        assert_eq!(grid, before);
    }

    #[tokio::test]
    async fn vacant_shift_survives_unrelated_command() {
        let svc = service(true);
        let mut day = DaySchedule::new(date(5));
        day.shifts.push(Shift::single(
            t("0600"),
            t("1800"),
            vec![Squad::active(SquadId::new(34)), Squad::active(SquadId::new(35))],
        ));
        day.shifts.push(Shift::single(t("1800"), t("0600"), vec![]));
        let Ok(_) = svc.apply_external(date(5), day, false).await else {
            panic!("seeding should succeed");
        };
        let Ok(_) = svc
            .execute(commit(CrewAction::RemoveCrew, "0600", "0700", 34))
            .await
        else {
            panic!("remove-crew should succeed");
        };
        let Ok(grid) = svc.current_grid(date(5)).await else {
            panic!("day should exist");
        };
        assert_eq!(grid.cell(1, 0), "0600-0700\n(Tango: 35)");
        assert_eq!(grid.cell(2, 0), "0700-1800\n(Tango: 34)");
        assert_eq!(grid.cell(3, 0), "1800-0600");
        assert_eq!(grid.cell(3, 1), "");
    }

    #[tokio::test]
    async fn revert_restores_exact_grid_twice() {
        let svc = seeded(true).await;
        let Ok(before) = svc.current_grid(date(5)).await else {
            panic!("seeded day should exist");
        };
        let Ok(CommandOutcome {
            change_id: Some(id),
            ..
        }) = svc.execute(remove_42(false)).await
        else {
            panic!("commit should return a change id");
        };

        let revert = Command::Revert {
            date: date(5),
            snapshot: id,
        };
        let (Ok(_), Ok(_)) = (svc.execute(revert.clone()).await, svc.execute(revert).await)
        else {
            panic!("revert should succeed");
        };
        assert!(matches!(svc.current_grid(date(5)).await, Ok(g) if g == before));
        assert!(matches!(svc.backups().list(date(5)).await, Ok(v) if v.len() == 1));
    }

    #[tokio::test]
    async fn revert_rejects_snapshot_of_other_day() {
        let svc = seeded(true).await;
        let Ok(CommandOutcome {
            change_id: Some(id),
            ..
        }) = svc.execute(remove_42(false)).await
        else {
            panic!("commit should return a change id");
        };
        let result = svc.revert(date(6), id).await;
        assert!(matches!(result, Err(ScheduleError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn disabled_backups_still_commit() {
        let svc = seeded(false).await;
        let Ok(outcome) = svc.execute(remove_42(false)).await else {
            panic!("commit should succeed");
        };
        assert!(outcome.change_id.is_none());
        let revert = svc.revert(date(5), SnapshotId::new()).await;
        assert!(matches!(revert, Err(ScheduleError::BackupUnavailable)));
    }

    #[tokio::test]
    async fn missing_day_is_not_found() {
        let svc = service(true);
        assert!(matches!(
            svc.execute(remove_42(true)).await,
            Err(ScheduleError::DayNotFound(_))
        ));
        assert!(matches!(
            svc.execute(Command::GetCurrent { date: date(5) }).await,
            Err(ScheduleError::DayNotFound(_))
        ));
    }

    #[tokio::test]
    async fn tango_continues_from_prior_day() {
        let svc = seeded(true).await;
        let mut next = DaySchedule::new(date(6));
        next.shifts.push(Shift::single(
            t("0600"),
            t("1800"),
            vec![Squad::active(SquadId::new(35)), Squad::active(SquadId::new(43))],
        ));
        let Ok(_) = svc.apply_external(date(6), next, false).await else {
            panic!("second day should apply");
        };
        // Day 5 ends with tango 42, so day 6 picks the next squad up.
        let Ok(day6) = svc.current_day(date(6)).await else {
            panic!("day 6 should exist");
        };
        assert_eq!(day6.final_tango(), Some(SquadId::new(43)));
    }

    #[tokio::test]
    async fn generate_month_keeps_existing_days_unless_overwriting() {
        let svc = seeded(true).await;
        let sheet = "\
,sunday,,monday,,tuesday,,wed,,thurs,,fri,,sat,
week1,0600 - 1800,34|35,0600 - 1800,42|43,0600 - 1800,54,0600 - 1800,34,0600 - 1800,35,0600 - 1800,42,0600 - 1800,43
";
        let Ok(month) = "202601".parse::<YearMonth>() else {
            panic!("valid month");
        };
        let Ok(report) = svc.generate_month(sheet, month, false).await else {
            panic!("generation should succeed");
        };
        assert_eq!(report.days_written, 30);
        assert_eq!(report.days_skipped, 1);

        let Ok(report) = svc.generate_month(sheet, month, true).await else {
            panic!("overwrite should succeed");
        };
        assert_eq!(report.days_written, 31);
        assert_eq!(report.snapshots.len(), 31);
    }
}
