//! Remote schedule authority and authentication state.
//!
//! The HTTP client, token storage and retry-on-401 handling live outside
//! this crate. The store only sees these narrow traits.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stagetrack_kernel::{
    ProjectSchedule, StageCatalog, StageRecord, StageStatus, initial_status,
};
use std::collections::BTreeMap;

/// Errors a remote call can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The authority confirms there is no schedule for this user.
    #[error("no schedule exists on the remote")]
    NotFound,

    #[error("remote rejected the session")]
    Unauthorized,

    #[error("remote unavailable: {0}")]
    Transient(String),

    #[error("malformed remote payload: {0}")]
    Malformed(String),
}

/// Remote view of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStage {
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
}

impl RemoteStage {
    pub fn with_status(status: StageStatus) -> Self {
        Self {
            status,
            end_date: None,
            locked: None,
        }
    }
}

/// Payload of `GET schedule`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub stages: BTreeMap<String, RemoteStage>,
}

impl RemoteSnapshot {
    /// Authority-side effect of `setStartDate`: every stage back to its initial status.
    pub fn started(catalog: &StageCatalog, start_date: NaiveDate) -> Self {
        let stages = catalog
            .stages()
            .iter()
            .enumerate()
            .map(|(ordinal, stage)| {
                (
                    stage.id.clone(),
                    RemoteStage::with_status(initial_status(ordinal)),
                )
            })
            .collect();
        Self {
            start_date: Some(start_date),
            stages,
        }
    }

    /// Authority-side effect of `updateStageStatus`.
    pub fn apply_status(
        &mut self,
        stage_id: &str,
        status: StageStatus,
    ) -> Result<RemoteStage, RemoteError> {
        let stage = self.stage_mut(stage_id)?;
        stage.status = status;
        Ok(stage.clone())
    }

    /// Authority-side effect of `calibrateStageEnd`.
    pub fn apply_calibration(
        &mut self,
        stage_id: &str,
        end_date: NaiveDate,
    ) -> Result<RemoteStage, RemoteError> {
        let stage = self.stage_mut(stage_id)?;
        stage.end_date = Some(end_date);
        Ok(stage.clone())
    }

    fn stage_mut(&mut self, stage_id: &str) -> Result<&mut RemoteStage, RemoteError> {
        if self.start_date.is_none() {
            return Err(RemoteError::NotFound);
        }
        self.stages
            .get_mut(stage_id)
            .ok_or_else(|| RemoteError::Malformed(format!("unknown stage {stage_id}")))
    }

    /// Project onto `catalog`. Returns the schedule and any stage ids the
    /// catalog does not know.
    pub fn to_schedule(&self, catalog: &StageCatalog) -> (ProjectSchedule, Vec<String>) {
        let Some(start_date) = self.start_date else {
            return (ProjectSchedule::empty(catalog), Vec::new());
        };

        let mut schedule = ProjectSchedule::started(catalog, start_date);
        let mut unknown = Vec::new();
        for (stage_id, remote) in &self.stages {
            match schedule.record_by_id_mut(stage_id) {
                Some(record) => apply_remote_stage(record, remote),
                None => unknown.push(stage_id.clone()),
            }
        }
        (schedule, unknown)
    }
}

/// Overwrite a local record with the remote's authoritative values.
pub fn apply_remote_stage(record: &mut StageRecord, remote: &RemoteStage) {
    record.status = remote.status;
    record.calibrated_end_date = remote.end_date;
    record.locked_override = remote.locked;
}

/// The remote schedule API.
pub trait RemoteSchedule {
    fn fetch_schedule(&mut self) -> Result<RemoteSnapshot, RemoteError>;
    fn set_start_date(&mut self, date: NaiveDate) -> Result<(), RemoteError>;
    fn update_stage_status(
        &mut self,
        stage_id: &str,
        status: StageStatus,
    ) -> Result<RemoteStage, RemoteError>;
    fn calibrate_stage_end(
        &mut self,
        stage_id: &str,
        end_date: NaiveDate,
    ) -> Result<RemoteStage, RemoteError>;
}

/// Stand-in when no authority is configured; every call is transient.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedRemote;

impl DetachedRemote {
    fn unavailable<T>() -> Result<T, RemoteError> {
        Err(RemoteError::Transient("no remote configured".to_string()))
    }
}

impl RemoteSchedule for DetachedRemote {
    fn fetch_schedule(&mut self) -> Result<RemoteSnapshot, RemoteError> {
        Self::unavailable()
    }

    fn set_start_date(&mut self, _date: NaiveDate) -> Result<(), RemoteError> {
        Self::unavailable()
    }

    fn update_stage_status(
        &mut self,
        _stage_id: &str,
        _status: StageStatus,
    ) -> Result<RemoteStage, RemoteError> {
        Self::unavailable()
    }

    fn calibrate_stage_end(
        &mut self,
        _stage_id: &str,
        _end_date: NaiveDate,
    ) -> Result<RemoteStage, RemoteError> {
        Self::unavailable()
    }
}

/// Session presence check, consulted before every remote call.
pub trait AuthState {
    fn is_authenticated(&self) -> bool;
}

/// Fixed authentication state.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAuth(pub bool);

impl AuthState for StaticAuth {
    fn is_authenticated(&self) -> bool {
        self.0
    }
}
