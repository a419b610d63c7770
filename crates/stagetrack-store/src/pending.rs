//! Pending-sync queue: local mutations the remote has not confirmed yet.
//!
//! At most one entry per stage plus at most one start-date entry. A newer
//! mutation replaces the older entry for the same key and stamps it with a
//! fresh sequence number, so a confirmation for the older push can be told
//! apart and ignored.

use crate::cache::CACHE_SCHEMA;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stagetrack_kernel::StageStatus;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

fn default_schema() -> u32 {
    CACHE_SCHEMA
}

/// Identifies one queue slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyncKey {
    StartDate,
    Stage(String),
}

impl Display for SyncKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncKey::StartDate => f.write_str("start_date"),
            SyncKey::Stage(stage_id) => write!(f, "stage:{stage_id}"),
        }
    }
}

/// Unconfirmed mutation of one stage.
///
/// Status and calibration are owed independently: a calibration alone must
/// not push a status the remote may have moved on from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSyncEntry {
    pub stage_id: String,
    /// Set when a status change still has to be pushed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intended_status: Option<StageStatus>,
    /// Set when a calibration still has to be pushed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibrated_end_date: Option<NaiveDate>,
    pub seq: u64,
}

/// Unconfirmed start-date change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingStartDate {
    pub date: NaiveDate,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSyncQueue {
    #[serde(default = "default_schema")]
    pub(crate) schema: u32,
    #[serde(default)]
    last_seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_date: Option<PendingStartDate>,
    #[serde(default)]
    stages: BTreeMap<String, PendingSyncEntry>,
}

impl Default for PendingSyncQueue {
    fn default() -> Self {
        Self {
            schema: CACHE_SCHEMA,
            last_seq: 0,
            start_date: None,
            stages: BTreeMap::new(),
        }
    }
}

impl PendingSyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self) -> u64 {
        self.last_seq += 1;
        self.last_seq
    }

    /// Highest sequence number handed out so far.
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len() + usize::from(self.start_date.is_some())
    }

    /// Queue a start-date change. Stage entries are dropped: the reset wipes
    /// the progress they described.
    pub fn record_start_date(&mut self, date: NaiveDate) -> u64 {
        let seq = self.bump();
        self.stages.clear();
        self.start_date = Some(PendingStartDate { date, seq });
        seq
    }

    /// Queue a status change, keeping any calibration still owed.
    pub fn record_status(&mut self, stage_id: &str, status: StageStatus) -> u64 {
        let seq = self.bump();
        let calibrated_end_date = self
            .stages
            .get(stage_id)
            .and_then(|entry| entry.calibrated_end_date);
        self.stages.insert(
            stage_id.to_string(),
            PendingSyncEntry {
                stage_id: stage_id.to_string(),
                intended_status: Some(status),
                calibrated_end_date,
                seq,
            },
        );
        seq
    }

    /// Queue a calibration, keeping any status change still owed.
    pub fn record_calibration(&mut self, stage_id: &str, end_date: NaiveDate) -> u64 {
        let seq = self.bump();
        let intended_status = self
            .stages
            .get(stage_id)
            .and_then(|entry| entry.intended_status);
        self.stages.insert(
            stage_id.to_string(),
            PendingSyncEntry {
                stage_id: stage_id.to_string(),
                intended_status,
                calibrated_end_date: Some(end_date),
                seq,
            },
        );
        seq
    }

    pub fn start_date_entry(&self) -> Option<&PendingStartDate> {
        self.start_date.as_ref()
    }

    pub fn stage_entry(&self, stage_id: &str) -> Option<&PendingSyncEntry> {
        self.stages.get(stage_id)
    }

    pub fn has_stage(&self, stage_id: &str) -> bool {
        self.stages.contains_key(stage_id)
    }

    /// Stage entries keyed by stage id.
    pub fn stage_entries(&self) -> impl Iterator<Item = &PendingSyncEntry> {
        self.stages.values()
    }

    /// Current sequence number for `key`, if queued.
    pub fn seq_of(&self, key: &SyncKey) -> Option<u64> {
        match key {
            SyncKey::StartDate => self.start_date.as_ref().map(|entry| entry.seq),
            SyncKey::Stage(stage_id) => self.stages.get(stage_id).map(|entry| entry.seq),
        }
    }

    /// Remove the entry for `key` if it still carries `seq`.
    ///
    /// Returns false when a newer mutation replaced the entry (or nothing is
    /// queued), in which case the queue is unchanged.
    pub fn confirm(&mut self, key: &SyncKey, seq: u64) -> bool {
        if self.seq_of(key) != Some(seq) {
            return false;
        }
        match key {
            SyncKey::StartDate => self.start_date = None,
            SyncKey::Stage(stage_id) => {
                self.stages.remove(stage_id);
            }
        }
        true
    }

    pub fn remove_stage(&mut self, stage_id: &str) -> Option<PendingSyncEntry> {
        self.stages.remove(stage_id)
    }

    /// Drop every entry. The sequence counter keeps counting.
    pub fn clear(&mut self) {
        self.start_date = None;
        self.stages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn newer_mutation_replaces_entry_and_keeps_calibration() {
        let mut queue = PendingSyncQueue::new();
        let first = queue.record_calibration("S01", date(2026, 3, 20));
        assert_eq!(
            queue.stage_entry("S01").and_then(|e| e.intended_status),
            None
        );
        let second = queue.record_status("S01", StageStatus::RectifyDone);

        assert!(second > first);
        assert_eq!(queue.len(), 1);
        let entry = queue.stage_entry("S01").expect("entry queued");
        assert_eq!(entry.intended_status, Some(StageStatus::RectifyDone));
        assert_eq!(entry.calibrated_end_date, Some(date(2026, 3, 20)));
        assert_eq!(entry.seq, second);
    }

    #[test]
    fn calibration_keeps_owed_status() {
        let mut queue = PendingSyncQueue::new();
        queue.record_status("S02", StageStatus::Rectify);
        queue.record_calibration("S02", date(2026, 3, 30));

        let entry = queue.stage_entry("S02").expect("entry queued");
        assert_eq!(entry.intended_status, Some(StageStatus::Rectify));
        assert_eq!(entry.calibrated_end_date, Some(date(2026, 3, 30)));

        let raw = serde_json::to_string(&PendingSyncQueue::new()).expect("serialize");
        assert_eq!(raw, r#"{"schema":1,"lastSeq":0,"stages":{}}"#);
    }

    #[test]
    fn stale_confirmation_is_ignored() {
        let mut queue = PendingSyncQueue::new();
        let key = SyncKey::Stage("S01".to_string());
        let stale = queue.record_status("S01", StageStatus::Completed);
        let fresh = queue.record_status("S01", StageStatus::Rectify);

        assert!(!queue.confirm(&key, stale));
        assert!(queue.has_stage("S01"));
        assert!(queue.confirm(&key, fresh));
        assert!(queue.is_empty());
        assert!(!queue.confirm(&key, fresh));
    }

    #[test]
    fn start_date_supersedes_stage_entries() {
        let mut queue = PendingSyncQueue::new();
        queue.record_status("S00", StageStatus::Completed);
        queue.record_status("S01", StageStatus::Rectify);
        let seq = queue.record_start_date(date(2026, 4, 1));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.seq_of(&SyncKey::StartDate), Some(seq));
        assert_eq!(queue.stage_entries().count(), 0);

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.last_seq(), seq);
        assert!(queue.record_status("S00", StageStatus::Completed) > seq);
    }

    #[test]
    fn queue_serializes_with_sequence_counter() {
        let mut queue = PendingSyncQueue::new();
        queue.record_status("S00", StageStatus::Completed);
        let raw = serde_json::to_string(&queue).expect("serialize");
        assert_eq!(
            raw,
            r#"{"schema":1,"lastSeq":1,"stages":{"S00":{"stageId":"S00","intendedStatus":"completed","seq":1}}}"#
        );
        let back: PendingSyncQueue = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(back, queue);
    }
}
