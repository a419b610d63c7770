//! Canonical stage status values.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Status of one stage in a project.
///
/// One enum for every stage. Front-ends that want different wording for the
/// manual-check stage map these values to labels on their side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    InProgress,
    Rectify,
    RectifyDone,
    Completed,
}

impl StageStatus {
    pub const ALL: [StageStatus; 5] = [
        StageStatus::Pending,
        StageStatus::InProgress,
        StageStatus::Rectify,
        StageStatus::RectifyDone,
        StageStatus::Completed,
    ];

    /// Whether this status releases the lock on the following stage.
    pub fn unlocks_next(self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::RectifyDone)
    }

    /// Whether the stage can still fall behind its planned end date.
    pub fn is_open(self) -> bool {
        matches!(self, StageStatus::Pending | StageStatus::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::InProgress => "in_progress",
            StageStatus::Rectify => "rectify",
            StageStatus::RectifyDone => "rectify_done",
            StageStatus::Completed => "completed",
        }
    }
}

impl Display for StageStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for StageStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}
