//! Display labels. The first stage is a manual material check; every later
//! stage ends in an inspection, so the same status reads differently.

use stagetrack_kernel::StageStatus;

pub fn status_label(ordinal: usize, status: StageStatus) -> &'static str {
    if ordinal == 0 {
        match status {
            StageStatus::Pending => "Not checked",
            StageStatus::InProgress => "Checking",
            StageStatus::Rectify => "Issues found",
            StageStatus::RectifyDone => "Issues resolved",
            StageStatus::Completed => "Accepted",
        }
    } else {
        match status {
            StageStatus::Pending => "Waiting",
            StageStatus::InProgress => "In progress",
            StageStatus::Rectify => "Needs rectification",
            StageStatus::RectifyDone => "Rectification accepted",
            StageStatus::Completed => "Inspection passed",
        }
    }
}
