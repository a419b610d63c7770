//! Stage state machine and the sequential locking rule.
//!
//! ```text
//! pending ─start─▶ in_progress ─complete─▶ completed
//!                        │
//!                        └─rectify─▶ rectify ─rectify_done─▶ rectify_done
//! ```
//!
//! `rectify` is reachable from any status of an unlocked stage. A stage at
//! ordinal `i > 0` is locked until stage `i - 1` is `completed` or
//! `rectify_done`, unless the remote authority supplied an explicit lock value.

use crate::catalog::StageCatalog;
use crate::error::ValidationError;
use crate::record::{ProjectSchedule, StageRecord};
use crate::status::StageStatus;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A user action that changes a stage's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageAction {
    Start,
    Complete,
    Rectify,
    RectifyDone,
}

impl StageAction {
    pub fn as_str(self) -> &'static str {
        match self {
            StageAction::Start => "start",
            StageAction::Complete => "complete",
            StageAction::Rectify => "rectify",
            StageAction::RectifyDone => "rectify_done",
        }
    }
}

impl Display for StageAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the stage at `ordinal` is locked.
///
/// Conservative rule: an ordinal outside `records` is reported locked.
pub fn is_locked(records: &[StageRecord], ordinal: usize) -> bool {
    if ordinal >= records.len() {
        return true;
    }
    if ordinal == 0 {
        return false;
    }
    match records[ordinal].locked_override {
        Some(locked) => locked,
        None => !records[ordinal - 1].status.unlocks_next(),
    }
}

/// Lock flag for every stage, in ordinal order.
pub fn lock_flags(records: &[StageRecord]) -> Vec<bool> {
    (0..records.len())
        .map(|ordinal| is_locked(records, ordinal))
        .collect()
}

/// Reject the action when the stage at `ordinal` is locked, naming its predecessor.
pub fn ensure_unlocked(
    catalog: &StageCatalog,
    schedule: &ProjectSchedule,
    ordinal: usize,
) -> Result<(), ValidationError> {
    let stage = catalog
        .stage(ordinal)
        .ok_or_else(|| ValidationError::UnknownStage(format!("#{ordinal}")))?;
    if !is_locked(schedule.records(), ordinal) {
        return Ok(());
    }

    let blocking = ordinal
        .checked_sub(1)
        .and_then(|previous| catalog.stage(previous))
        .unwrap_or(stage);
    Err(ValidationError::Locked {
        stage_id: stage.id.clone(),
        blocking_stage_id: blocking.id.clone(),
        blocking_stage_name: blocking.display_name.clone(),
    })
}

/// Validate `action` on the stage at `ordinal` and return the resulting status.
pub fn check_transition(
    catalog: &StageCatalog,
    schedule: &ProjectSchedule,
    ordinal: usize,
    action: StageAction,
) -> Result<StageStatus, ValidationError> {
    if !schedule.is_started() {
        return Err(ValidationError::NoSchedule);
    }
    ensure_unlocked(catalog, schedule, ordinal)?;

    let record = schedule
        .record(ordinal)
        .ok_or_else(|| ValidationError::UnknownStage(format!("#{ordinal}")))?;
    let invalid = || ValidationError::InvalidTransition {
        stage_id: record.stage_id.clone(),
        from: record.status,
        action,
    };

    match action {
        StageAction::Start if record.status == StageStatus::Pending => {
            Ok(StageStatus::InProgress)
        }
        StageAction::Start => Err(invalid()),
        StageAction::Complete if record.status == StageStatus::Completed => Err(
            ValidationError::AlreadyCompleted(record.stage_id.clone()),
        ),
        StageAction::Complete => Ok(StageStatus::Completed),
        StageAction::Rectify => Ok(StageStatus::Rectify),
        StageAction::RectifyDone if record.status == StageStatus::Rectify => {
            Ok(StageStatus::RectifyDone)
        }
        StageAction::RectifyDone => Err(invalid()),
    }
}

/// Validate and apply `action` on `stage_id`. Returns the new status.
///
/// On error the schedule is left untouched.
pub fn apply_transition(
    catalog: &StageCatalog,
    schedule: &mut ProjectSchedule,
    stage_id: &str,
    action: StageAction,
) -> Result<StageStatus, ValidationError> {
    let ordinal = catalog
        .ordinal_of(stage_id)
        .ok_or_else(|| ValidationError::UnknownStage(stage_id.to_string()))?;
    let next = check_transition(catalog, schedule, ordinal, action)?;
    set_status(schedule, ordinal, next);
    Ok(next)
}

/// Write `status` on the stage at `ordinal` and re-derive the follower's lock.
///
/// The remote lock value on the next stage was computed against the old
/// status, so it is dropped once the status actually changes.
pub fn set_status(schedule: &mut ProjectSchedule, ordinal: usize, status: StageStatus) {
    let changed = match schedule.record_mut(ordinal) {
        Some(record) if record.status != status => {
            record.status = status;
            true
        }
        _ => false,
    };
    if changed && let Some(next) = schedule.record_mut(ordinal + 1) {
        next.locked_override = None;
    }
}
