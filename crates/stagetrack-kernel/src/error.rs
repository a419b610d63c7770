//! Validation errors for user actions on a project schedule.
//!
//! These are rejected synchronously and never mutate state. The `Display`
//! text is meant to be shown to the homeowner as-is.

use crate::machine::StageAction;
use crate::status::StageStatus;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The stage id is not part of the catalog.
    #[error("unknown stage: {0}")]
    UnknownStage(String),

    /// No start date has been set yet.
    #[error("set a project start date first")]
    NoSchedule,

    /// Start dates cannot be set in the past.
    #[error("start date {date} is before today ({today})")]
    StartDateInPast { date: NaiveDate, today: NaiveDate },

    /// The stage's predecessor has not reached an unlocking status.
    #[error("\"{blocking_stage_name}\" must be completed before {stage_id} can be updated")]
    Locked {
        stage_id: String,
        blocking_stage_id: String,
        blocking_stage_name: String,
    },

    #[error("stage {0} is already completed")]
    AlreadyCompleted(String),

    #[error("stage {stage_id} cannot {action} from {from}")]
    InvalidTransition {
        stage_id: String,
        from: StageStatus,
        action: StageAction,
    },

    #[error("end date {date} is before today ({today})")]
    CalibrationBeforeToday { date: NaiveDate, today: NaiveDate },

    #[error("end date {date} must be after the stage start ({stage_start})")]
    CalibrationNotAfterStart {
        date: NaiveDate,
        stage_start: NaiveDate,
    },
}

impl ValidationError {
    /// Stage that blocked the action, when the rejection was a lock.
    pub fn blocking_stage_id(&self) -> Option<&str> {
        match self {
            ValidationError::Locked {
                blocking_stage_id, ..
            } => Some(blocking_stage_id.as_str()),
            _ => None,
        }
    }
}
