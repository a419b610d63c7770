//! Serialized records persisted to local storage.
//!
//! Two keys are owned by the store:
//! - `stagetrack.schedule`: start date, status map, calibrated end dates
//! - `stagetrack.pending_sync`: queued mutations and the sequence counter

use crate::pending::PendingSyncQueue;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stagetrack_kernel::{ProjectSchedule, StageCatalog, StageStatus};
use std::collections::BTreeMap;

pub const SCHEDULE_KEY: &str = "stagetrack.schedule";
pub const PENDING_KEY: &str = "stagetrack.pending_sync";
pub const CACHE_SCHEMA: u32 = 1;

fn default_schema() -> u32 {
    CACHE_SCHEMA
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("unsupported cache schema {actual} (expected {CACHE_SCHEMA})")]
    UnsupportedSchema { actual: u32 },
}

/// Persisted form of a project schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    #[serde(default = "default_schema")]
    pub schema: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub stage_status_map: BTreeMap<String, StageStatus>,
    #[serde(default)]
    pub calibrated_end_dates: BTreeMap<String, NaiveDate>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lock_overrides: BTreeMap<String, bool>,
}

impl CacheRecord {
    pub fn from_schedule(schedule: &ProjectSchedule) -> Self {
        let mut record = Self {
            schema: CACHE_SCHEMA,
            start_date: schedule.start_date(),
            stage_status_map: BTreeMap::new(),
            calibrated_end_dates: BTreeMap::new(),
            lock_overrides: BTreeMap::new(),
        };
        if schedule.is_started() {
            for stage in schedule.records() {
                record
                    .stage_status_map
                    .insert(stage.stage_id.clone(), stage.status);
                if let Some(date) = stage.calibrated_end_date {
                    record
                        .calibrated_end_dates
                        .insert(stage.stage_id.clone(), date);
                }
                if let Some(locked) = stage.locked_override {
                    record.lock_overrides.insert(stage.stage_id.clone(), locked);
                }
            }
        }
        record
    }

    /// Rebuild the schedule against `catalog`.
    ///
    /// Stage ids the catalog does not know are dropped; stages missing from
    /// the record keep their initial values.
    pub fn into_schedule(self, catalog: &StageCatalog) -> Result<ProjectSchedule, CacheError> {
        if self.schema != CACHE_SCHEMA {
            return Err(CacheError::UnsupportedSchema {
                actual: self.schema,
            });
        }
        let Some(start_date) = self.start_date else {
            return Ok(ProjectSchedule::empty(catalog));
        };

        let mut schedule = ProjectSchedule::started(catalog, start_date);
        for (stage_id, status) in self.stage_status_map {
            if let Some(record) = schedule.record_by_id_mut(&stage_id) {
                record.status = status;
            }
        }
        for (stage_id, date) in self.calibrated_end_dates {
            if let Some(record) = schedule.record_by_id_mut(&stage_id) {
                record.calibrated_end_date = Some(date);
            }
        }
        for (stage_id, locked) in self.lock_overrides {
            if let Some(record) = schedule.record_by_id_mut(&stage_id) {
                record.locked_override = Some(locked);
            }
        }
        Ok(schedule)
    }
}

pub fn encode_schedule(schedule: &ProjectSchedule) -> Result<String, CacheError> {
    serde_json::to_string(&CacheRecord::from_schedule(schedule))
        .map_err(|e| CacheError::Serialize(e.to_string()))
}

pub fn decode_schedule(raw: &str, catalog: &StageCatalog) -> Result<ProjectSchedule, CacheError> {
    let record: CacheRecord =
        serde_json::from_str(raw).map_err(|e| CacheError::Parse(e.to_string()))?;
    record.into_schedule(catalog)
}

pub fn encode_pending(queue: &PendingSyncQueue) -> Result<String, CacheError> {
    serde_json::to_string(queue).map_err(|e| CacheError::Serialize(e.to_string()))
}

pub fn decode_pending(raw: &str) -> Result<PendingSyncQueue, CacheError> {
    let queue: PendingSyncQueue =
        serde_json::from_str(raw).map_err(|e| CacheError::Parse(e.to_string()))?;
    if queue.schema != CACHE_SCHEMA {
        return Err(CacheError::UnsupportedSchema {
            actual: queue.schema,
        });
    }
    Ok(queue)
}
