//! Reminder indicators for stages starting or ending soon.

use crate::record::ProjectSchedule;
use crate::schedule::{DerivedSchedule, StageWindow, days_between};
use crate::status::StageStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const ALLOWED_REMINDER_LEAD_DAYS: [u32; 4] = [1, 3, 5, 7];
pub const DEFAULT_REMINDER_LEAD_DAYS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("reminder lead must be one of {ALLOWED_REMINDER_LEAD_DAYS:?} days (got {0})")]
pub struct InvalidLeadDays(pub u32);

/// How many days ahead of a planned start/end a stage is flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ReminderLeadDays(u32);

impl ReminderLeadDays {
    pub fn new(days: u32) -> Result<Self, InvalidLeadDays> {
        if ALLOWED_REMINDER_LEAD_DAYS.contains(&days) {
            Ok(Self(days))
        } else {
            Err(InvalidLeadDays(days))
        }
    }

    pub fn days(self) -> u32 {
        self.0
    }
}

impl Default for ReminderLeadDays {
    fn default() -> Self {
        Self(DEFAULT_REMINDER_LEAD_DAYS)
    }
}

impl TryFrom<u32> for ReminderLeadDays {
    type Error = InvalidLeadDays;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        Self::new(days)
    }
}

impl From<ReminderLeadDays> for u32 {
    fn from(lead: ReminderLeadDays) -> Self {
        lead.0
    }
}

/// Whether one stage needs a reminder today.
///
/// Settled stages never do. Otherwise the planned start or end must fall in
/// `[today, today + lead]`; past dates belong to the behind-schedule signal.
pub fn needs_reminder(
    window: &StageWindow,
    status: StageStatus,
    lead: ReminderLeadDays,
    today: NaiveDate,
) -> bool {
    if status.unlocks_next() {
        return false;
    }
    let lead = i64::from(lead.days());
    let within = |date: NaiveDate| (0..=lead).contains(&days_between(today, date));
    within(window.start_date) || within(window.end_date)
}

/// Reminder flag per stage in ordinal order; all false without a start date.
pub fn evaluate_reminders(
    derived: &DerivedSchedule,
    schedule: &ProjectSchedule,
    lead: ReminderLeadDays,
    today: NaiveDate,
) -> Vec<bool> {
    schedule
        .records()
        .iter()
        .enumerate()
        .map(|(ordinal, record)| {
            derived
                .window(ordinal)
                .is_some_and(|window| needs_reminder(window, record.status, lead, today))
        })
        .collect()
}
