//! # Stagetrack Kernel
//!
//! Scheduling and locking rules for a six-stage renovation project.
//!
//! Every function here is synchronous and side-effect free. Storage, remote
//! reconciliation and clocks live in `stagetrack-store`; "today" is always
//! passed in.
//!
//! ## Architecture
//!
//! ```text
//! StageCatalog          ← ordered stages with nominal durations
//!     │
//! ProjectSchedule       ← start date + one StageRecord per stage
//!     │
//! machine               ← status transitions and the predecessor lock
//!     │
//! schedule              ← windows, progress, worst behind-schedule stage
//!     │
//! reminder              ← lead-window reminder flags
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod machine;
pub mod record;
pub mod reminder;
pub mod schedule;
pub mod status;

pub use catalog::{CatalogError, STAGE_COUNT, Stage, StageCatalog};
pub use config::{ConfigError, EngineConfig};
pub use error::ValidationError;
pub use machine::{StageAction, apply_transition, is_locked, lock_flags};
pub use record::{ProjectSchedule, StageRecord, initial_status};
pub use reminder::{
    ALLOWED_REMINDER_LEAD_DAYS, DEFAULT_REMINDER_LEAD_DAYS, InvalidLeadDays, ReminderLeadDays,
    evaluate_reminders, needs_reminder,
};
pub use schedule::{
    DerivedSchedule, StageWindow, check_calibration, compute_schedule, days_between,
};
pub use status::{ParseStatusError, StageStatus};
