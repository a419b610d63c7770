//! Per-project dynamic state: start date plus one record per stage.

use crate::catalog::StageCatalog;
use crate::status::StageStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Dynamic state of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage_id: String,
    pub status: StageStatus,
    /// Manual override of the computed end date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibrated_end_date: Option<NaiveDate>,
    /// Lock value supplied verbatim by the remote authority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_override: Option<bool>,
}

impl StageRecord {
    pub fn initial(stage_id: impl Into<String>, ordinal: usize) -> Self {
        Self {
            stage_id: stage_id.into(),
            status: initial_status(ordinal),
            calibrated_end_date: None,
            locked_override: None,
        }
    }
}

/// Status a stage takes whenever the start date is (re)set.
///
/// The first stage is a manual check the homeowner can act on immediately.
pub fn initial_status(ordinal: usize) -> StageStatus {
    if ordinal == 0 {
        StageStatus::InProgress
    } else {
        StageStatus::Pending
    }
}

/// Start date plus the ordered stage records of one project.
///
/// Always holds exactly one record per catalog stage, in ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSchedule {
    start_date: Option<NaiveDate>,
    records: Vec<StageRecord>,
}

impl ProjectSchedule {
    /// A project without a start date. Records sit at their initial values.
    pub fn empty(catalog: &StageCatalog) -> Self {
        Self::with_start(catalog, None)
    }

    /// A freshly (re)started project: every stage back at its initial status.
    pub fn started(catalog: &StageCatalog, start_date: NaiveDate) -> Self {
        Self::with_start(catalog, Some(start_date))
    }

    fn with_start(catalog: &StageCatalog, start_date: Option<NaiveDate>) -> Self {
        let records = catalog
            .stages()
            .iter()
            .enumerate()
            .map(|(ordinal, stage)| StageRecord::initial(stage.id.clone(), ordinal))
            .collect();
        Self {
            start_date,
            records,
        }
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn is_started(&self) -> bool {
        self.start_date.is_some()
    }

    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    pub fn record(&self, ordinal: usize) -> Option<&StageRecord> {
        self.records.get(ordinal)
    }

    pub fn record_mut(&mut self, ordinal: usize) -> Option<&mut StageRecord> {
        self.records.get_mut(ordinal)
    }

    pub fn record_by_id(&self, stage_id: &str) -> Option<&StageRecord> {
        self.records.iter().find(|record| record.stage_id == stage_id)
    }

    pub fn record_by_id_mut(&mut self, stage_id: &str) -> Option<&mut StageRecord> {
        self.records
            .iter_mut()
            .find(|record| record.stage_id == stage_id)
    }

    /// Stages carrying a calibrated end date, in ordinal order.
    pub fn calibrations(&self) -> impl Iterator<Item = (&str, NaiveDate)> {
        self.records.iter().filter_map(|record| {
            record
                .calibrated_end_date
                .map(|date| (record.stage_id.as_str(), date))
        })
    }
}
