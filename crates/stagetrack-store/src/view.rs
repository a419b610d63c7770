//! The derived schedule handed to front-ends.

use crate::pending::PendingSyncQueue;
use chrono::NaiveDate;
use serde::Serialize;
use stagetrack_kernel::{
    ProjectSchedule, ReminderLeadDays, StageCatalog, StageStatus, compute_schedule,
    evaluate_reminders, lock_flags,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageView {
    pub stage_id: String,
    pub display_name: String,
    pub ordinal: usize,
    pub status: StageStatus,
    pub locked: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub remaining_days: Option<i64>,
    pub calibrated: bool,
    pub needs_reminder: bool,
    pub pending_sync: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleView {
    pub start_date: Option<NaiveDate>,
    pub start_date_pending_sync: bool,
    pub stages: Vec<StageView>,
    pub overall_progress_percent: u8,
    pub days_behind: i64,
    pub behind_stage_id: Option<String>,
}

impl ScheduleView {
    pub fn build(
        catalog: &StageCatalog,
        schedule: &ProjectSchedule,
        pending: &PendingSyncQueue,
        lead: ReminderLeadDays,
        today: NaiveDate,
    ) -> Self {
        let derived = compute_schedule(catalog, schedule, today);
        let reminders = evaluate_reminders(&derived, schedule, lead, today);
        let locks = lock_flags(schedule.records());

        let stages = catalog
            .stages()
            .iter()
            .zip(schedule.records())
            .enumerate()
            .map(|(ordinal, (stage, record))| {
                let window = derived.window(ordinal);
                StageView {
                    stage_id: stage.id.clone(),
                    display_name: stage.display_name.clone(),
                    ordinal,
                    status: record.status,
                    locked: locks.get(ordinal).copied().unwrap_or(true),
                    start_date: window.map(|w| w.start_date),
                    end_date: window.map(|w| w.end_date),
                    remaining_days: window.map(|w| w.remaining_days),
                    calibrated: window.is_some_and(|w| w.calibrated),
                    needs_reminder: reminders.get(ordinal).copied().unwrap_or(false),
                    pending_sync: pending.has_stage(&stage.id),
                }
            })
            .collect();

        Self {
            start_date: schedule.start_date(),
            start_date_pending_sync: pending.start_date_entry().is_some(),
            stages,
            overall_progress_percent: derived.overall_progress_percent,
            days_behind: derived.days_behind,
            behind_stage_id: derived.behind_stage_id,
        }
    }

    pub fn stage(&self, stage_id: &str) -> Option<&StageView> {
        self.stages.iter().find(|stage| stage.stage_id == stage_id)
    }
}
