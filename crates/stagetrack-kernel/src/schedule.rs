//! Calendar schedule derivation.
//!
//! Stages run back to back with a one-day gap: a stage ends
//! `nominal_duration_days` after it starts (or on its calibrated end date),
//! and the next stage starts the day after.

use crate::catalog::StageCatalog;
use crate::error::ValidationError;
use crate::machine::ensure_unlocked;
use crate::record::ProjectSchedule;
use crate::status::StageStatus;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Planned calendar window of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageWindow {
    pub stage_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Days from today until `end_date`, never negative.
    pub remaining_days: i64,
    pub calibrated: bool,
}

/// Everything derived from a project schedule for one value of "today".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedSchedule {
    /// One window per stage in ordinal order; empty without a start date.
    pub windows: Vec<StageWindow>,
    pub overall_progress_percent: u8,
    /// Largest overrun among open stages, 0 when nothing is behind.
    pub days_behind: i64,
    pub behind_stage_id: Option<String>,
}

impl DerivedSchedule {
    pub fn window(&self, ordinal: usize) -> Option<&StageWindow> {
        self.windows.get(ordinal)
    }

    pub fn window_for(&self, stage_id: &str) -> Option<&StageWindow> {
        self.windows.iter().find(|window| window.stage_id == stage_id)
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Derive stage windows, progress and the worst behind-schedule stage.
///
/// Pure: identical inputs always produce an identical result.
pub fn compute_schedule(
    catalog: &StageCatalog,
    schedule: &ProjectSchedule,
    today: NaiveDate,
) -> DerivedSchedule {
    let Some(start_date) = schedule.start_date() else {
        return DerivedSchedule::default();
    };

    let mut windows = Vec::with_capacity(catalog.len());
    let mut cursor = start_date;
    let mut days_behind = 0i64;
    let mut behind_stage_id = None;

    for (ordinal, stage) in catalog.stages().iter().enumerate() {
        let record = schedule.record(ordinal);
        let calibrated_end = record.and_then(|record| record.calibrated_end_date);
        let status = record.map_or(StageStatus::Pending, |record| record.status);

        let stage_start = cursor;
        let stage_end = calibrated_end
            .unwrap_or_else(|| add_days(stage_start, u64::from(stage.nominal_duration_days)));
        cursor = add_days(stage_end, 1);

        if status.is_open() && today > stage_end {
            let behind = days_between(stage_end, today);
            if behind > days_behind {
                days_behind = behind;
                behind_stage_id = Some(stage.id.clone());
            }
        }

        windows.push(StageWindow {
            stage_id: stage.id.clone(),
            start_date: stage_start,
            end_date: stage_end,
            remaining_days: days_between(today, stage_end).max(0),
            calibrated: calibrated_end.is_some(),
        });
    }

    DerivedSchedule {
        windows,
        overall_progress_percent: progress_percent(schedule, catalog.len()),
        days_behind,
        behind_stage_id,
    }
}

/// Validate a manual end date for `stage_id` and return the stage ordinal.
///
/// The date must not be before today and must fall strictly after the stage's
/// computed start.
pub fn check_calibration(
    catalog: &StageCatalog,
    schedule: &ProjectSchedule,
    stage_id: &str,
    end_date: NaiveDate,
    today: NaiveDate,
) -> Result<usize, ValidationError> {
    let ordinal = catalog
        .ordinal_of(stage_id)
        .ok_or_else(|| ValidationError::UnknownStage(stage_id.to_string()))?;
    if !schedule.is_started() {
        return Err(ValidationError::NoSchedule);
    }
    ensure_unlocked(catalog, schedule, ordinal)?;

    if end_date < today {
        return Err(ValidationError::CalibrationBeforeToday {
            date: end_date,
            today,
        });
    }

    let derived = compute_schedule(catalog, schedule, today);
    let window = derived
        .window(ordinal)
        .ok_or(ValidationError::NoSchedule)?;
    if end_date <= window.start_date {
        return Err(ValidationError::CalibrationNotAfterStart {
            date: end_date,
            stage_start: window.start_date,
        });
    }
    Ok(ordinal)
}

/// Rounded share of stages whose status is exactly `completed`.
fn progress_percent(schedule: &ProjectSchedule, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = schedule
        .records()
        .iter()
        .filter(|record| record.status == StageStatus::Completed)
        .count();
    // Half-up rounding in integers.
    let percent = (200 * completed + total) / (2 * total);
    u8::try_from(percent.min(100)).unwrap_or(100)
}

pub(crate) fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days))
        .unwrap_or(NaiveDate::MAX)
}

/// Signed calendar days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{StageAction, apply_transition};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn started(start: NaiveDate) -> (StageCatalog, ProjectSchedule) {
        let catalog = StageCatalog::standard();
        let schedule = ProjectSchedule::started(&catalog, start);
        (catalog, schedule)
    }

    #[test]
    fn empty_without_start_date() {
        let catalog = StageCatalog::standard();
        let derived = compute_schedule(
            &catalog,
            &ProjectSchedule::empty(&catalog),
            date(2026, 3, 1),
        );
        assert!(derived.is_empty());
        assert_eq!(derived.overall_progress_percent, 0);
        assert_eq!(derived.days_behind, 0);
        assert_eq!(derived.behind_stage_id, None);
    }

    #[test]
    fn reference_project_windows() {
        let (catalog, schedule) = started(date(2026, 3, 1));
        let derived = compute_schedule(&catalog, &schedule, date(2026, 2, 20));

        let spans: Vec<(NaiveDate, NaiveDate)> = derived
            .windows
            .iter()
            .map(|window| (window.start_date, window.end_date))
            .collect();
        assert_eq!(
            spans,
            vec![
                (date(2026, 3, 1), date(2026, 3, 4)),
                (date(2026, 3, 5), date(2026, 3, 12)),
                (date(2026, 3, 13), date(2026, 3, 23)),
                (date(2026, 3, 24), date(2026, 3, 31)),
                (date(2026, 4, 1), date(2026, 4, 8)),
                (date(2026, 4, 9), date(2026, 4, 14)),
            ]
        );
    }

    #[test]
    fn windows_are_contiguous_with_one_day_gaps() {
        let catalog = StageCatalog::standard();
        for start in [
            date(2026, 1, 1),
            date(2026, 2, 27),
            date(2028, 2, 28),
            date(2030, 12, 20),
        ] {
            let schedule = ProjectSchedule::started(&catalog, start);
            let derived = compute_schedule(&catalog, &schedule, start);

            assert_eq!(derived.windows[0].start_date, start);
            for pair in derived.windows.windows(2) {
                assert!(pair[0].start_date < pair[0].end_date);
                assert_eq!(days_between(pair[0].end_date, pair[1].start_date), 1);
            }
            let last = derived.windows.last().expect("six windows");
            assert_eq!(
                last.end_date,
                add_days(start, catalog.total_nominal_days() + 5)
            );
        }
    }

    #[test]
    fn calibration_shifts_following_stages() {
        let (catalog, mut schedule) = started(date(2026, 3, 1));
        schedule.record_mut(1).expect("stage 1").calibrated_end_date = Some(date(2026, 3, 20));
        let derived = compute_schedule(&catalog, &schedule, date(2026, 3, 1));

        let s1 = derived.window_for("S01").expect("S01");
        assert!(s1.calibrated);
        assert_eq!(s1.end_date, date(2026, 3, 20));
        let s2 = derived.window_for("S02").expect("S02");
        assert!(!s2.calibrated);
        assert_eq!(s2.start_date, date(2026, 3, 21));
        assert_eq!(s2.end_date, date(2026, 3, 31));
    }

    #[test]
    fn progress_counts_completed_only() {
        let (catalog, mut schedule) = started(date(2026, 3, 1));
        apply_transition(&catalog, &mut schedule, "S00", StageAction::Complete).expect("S00");
        let derived = compute_schedule(&catalog, &schedule, date(2026, 3, 1));
        assert_eq!(derived.overall_progress_percent, 17);

        apply_transition(&catalog, &mut schedule, "S01", StageAction::Rectify).expect("S01");
        apply_transition(&catalog, &mut schedule, "S01", StageAction::RectifyDone).expect("S01");
        apply_transition(&catalog, &mut schedule, "S02", StageAction::Complete).expect("S02");
        let derived = compute_schedule(&catalog, &schedule, date(2026, 3, 1));
        assert_eq!(derived.overall_progress_percent, 33);
    }

    #[test]
    fn behind_reports_worst_open_stage() {
        let (catalog, mut schedule) = started(date(2026, 3, 1));
        let today = date(2026, 3, 20);

        let derived = compute_schedule(&catalog, &schedule, today);
        assert_eq!(derived.behind_stage_id.as_deref(), Some("S00"));
        assert_eq!(derived.days_behind, 16);
        assert_eq!(derived.window(0).expect("S00").remaining_days, 0);

        apply_transition(&catalog, &mut schedule, "S00", StageAction::Complete).expect("S00");
        let derived = compute_schedule(&catalog, &schedule, today);
        assert_eq!(derived.behind_stage_id.as_deref(), Some("S01"));
        assert_eq!(derived.days_behind, 8);

        apply_transition(&catalog, &mut schedule, "S01", StageAction::Rectify).expect("S01");
        let derived = compute_schedule(&catalog, &schedule, today);
        assert_eq!(derived.behind_stage_id, None);
        assert_eq!(derived.days_behind, 0);
    }

    #[test]
    fn behind_ties_keep_earliest_stage() {
        let (catalog, mut schedule) = started(date(2026, 3, 1));
        schedule.record_mut(1).expect("stage 1").calibrated_end_date = Some(date(2026, 3, 4));
        let derived = compute_schedule(&catalog, &schedule, date(2026, 3, 10));
        assert_eq!(derived.days_behind, 6);
        assert_eq!(derived.behind_stage_id.as_deref(), Some("S00"));
    }

    #[test]
    fn repeated_calls_are_identical() {
        let (catalog, schedule) = started(date(2026, 3, 1));
        let today = date(2026, 3, 9);
        assert_eq!(
            compute_schedule(&catalog, &schedule, today),
            compute_schedule(&catalog, &schedule, today)
        );
    }

    #[test]
    fn calibration_rules() {
        let (catalog, mut schedule) = started(date(2026, 3, 1));
        let today = date(2026, 2, 20);
        apply_transition(&catalog, &mut schedule, "S00", StageAction::Complete).expect("S00");
        apply_transition(&catalog, &mut schedule, "S01", StageAction::Rectify).expect("S01");

        assert_eq!(
            check_calibration(&catalog, &schedule, "S01", date(2026, 2, 19), today),
            Err(ValidationError::CalibrationBeforeToday {
                date: date(2026, 2, 19),
                today,
            })
        );
        assert_eq!(
            check_calibration(&catalog, &schedule, "S01", date(2026, 3, 5), today),
            Err(ValidationError::CalibrationNotAfterStart {
                date: date(2026, 3, 5),
                stage_start: date(2026, 3, 5),
            })
        );
        assert_eq!(
            check_calibration(&catalog, &schedule, "S01", date(2026, 3, 6), today),
            Ok(1)
        );
        assert!(matches!(
            check_calibration(&catalog, &schedule, "S03", date(2026, 4, 20), today),
            Err(ValidationError::Locked { .. })
        ));
    }
}
