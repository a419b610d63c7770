//! Integration tests: reference project vectors for the kernel.
//!
//! The reference project starts 2026-03-01 on the standard catalog
//! (durations 3, 7, 10, 7, 7, 5).

use chrono::NaiveDate;
use stagetrack_kernel::{
    ProjectSchedule, ReminderLeadDays, StageAction, StageCatalog, StageStatus, apply_transition,
    compute_schedule, evaluate_reminders, is_locked,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn reference_project() -> (StageCatalog, ProjectSchedule) {
    let catalog = StageCatalog::standard();
    let schedule = ProjectSchedule::started(&catalog, date(2026, 3, 1));
    (catalog, schedule)
}

#[test]
fn reference_project_snapshot() {
    let (catalog, schedule) = reference_project();
    let derived = compute_schedule(&catalog, &schedule, date(2026, 2, 20));

    insta::assert_json_snapshot!(derived, @r#"
    {
      "windows": [
        {
          "stage_id": "S00",
          "start_date": "2026-03-01",
          "end_date": "2026-03-04",
          "remaining_days": 12,
          "calibrated": false
        },
        {
          "stage_id": "S01",
          "start_date": "2026-03-05",
          "end_date": "2026-03-12",
          "remaining_days": 20,
          "calibrated": false
        },
        {
          "stage_id": "S02",
          "start_date": "2026-03-13",
          "end_date": "2026-03-23",
          "remaining_days": 31,
          "calibrated": false
        },
        {
          "stage_id": "S03",
          "start_date": "2026-03-24",
          "end_date": "2026-03-31",
          "remaining_days": 39,
          "calibrated": false
        },
        {
          "stage_id": "S04",
          "start_date": "2026-04-01",
          "end_date": "2026-04-08",
          "remaining_days": 47,
          "calibrated": false
        },
        {
          "stage_id": "S05",
          "start_date": "2026-04-09",
          "end_date": "2026-04-14",
          "remaining_days": 53,
          "calibrated": false
        }
      ],
      "overall_progress_percent": 0,
      "days_behind": 0,
      "behind_stage_id": null
    }
    "#);
}

#[test]
fn lock_predicate_over_every_predecessor_status() {
    let catalog = StageCatalog::standard();
    for ordinal in 1..catalog.len() {
        for status in StageStatus::ALL {
            let mut schedule = ProjectSchedule::started(&catalog, date(2026, 3, 1));
            schedule
                .record_mut(ordinal - 1)
                .expect("predecessor exists")
                .status = status;

            assert_eq!(
                is_locked(schedule.records(), ordinal),
                !matches!(status, StageStatus::Completed | StageStatus::RectifyDone),
                "ordinal {ordinal} with predecessor {status}"
            );

            for locked in [true, false] {
                schedule.record_mut(ordinal).expect("stage exists").locked_override =
                    Some(locked);
                assert_eq!(is_locked(schedule.records(), ordinal), locked);
            }
        }
    }
}

#[test]
fn rejected_actions_leave_derived_schedule_unchanged() {
    let (catalog, mut schedule) = reference_project();
    let today = date(2026, 3, 3);
    let before = serde_json::to_string(&compute_schedule(&catalog, &schedule, today))
        .expect("derived serializes");

    for stage_id in ["S01", "S02", "S05"] {
        for action in [StageAction::Complete, StageAction::Rectify] {
            assert!(apply_transition(&catalog, &mut schedule, stage_id, action).is_err());
        }
    }

    let after = serde_json::to_string(&compute_schedule(&catalog, &schedule, today))
        .expect("derived serializes");
    assert_eq!(before, after);
}

#[test]
fn walking_the_project_to_completion() {
    let (catalog, mut schedule) = reference_project();
    for stage in catalog.stages() {
        if schedule
            .record_by_id(&stage.id)
            .is_some_and(|record| record.status == StageStatus::Pending)
        {
            apply_transition(&catalog, &mut schedule, &stage.id, StageAction::Start)
                .expect("unlocked pending stage starts");
        }
        apply_transition(&catalog, &mut schedule, &stage.id, StageAction::Complete)
            .expect("stage completes");
    }

    let today = date(2026, 4, 13);
    let derived = compute_schedule(&catalog, &schedule, today);
    assert_eq!(derived.overall_progress_percent, 100);
    assert_eq!(derived.behind_stage_id, None);
    assert!(
        evaluate_reminders(&derived, &schedule, ReminderLeadDays::default(), today)
            .iter()
            .all(|flag| !flag)
    );
}
