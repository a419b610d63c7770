//! The reconciliation store: single owner of a project's schedule.
//!
//! Every user action is applied locally first (optimistic), persisted, then
//! pushed to the remote when a session exists. Pushes that cannot be
//! confirmed leave a pending-sync entry that is retried on the next
//! load, sync, connectivity change or auth change.
//!
//! ```text
//! action ─▶ validate ─▶ local schedule ─▶ local storage
//!                              │
//!                              └─▶ pending queue ─▶ remote ─▶ confirm / keep queued
//! ```

use crate::cache::{
    CacheError, PENDING_KEY, SCHEDULE_KEY, decode_pending, decode_schedule, encode_pending,
    encode_schedule,
};
use crate::clock::Clock;
use crate::pending::{PendingSyncQueue, SyncKey};
use crate::remote::{AuthState, RemoteError, RemoteSchedule, RemoteSnapshot, RemoteStage};
use crate::storage::{KeyValueStorage, StorageError};
use crate::view::ScheduleView;
use chrono::NaiveDate;
use stagetrack_kernel::machine::{self, StageAction};
use stagetrack_kernel::{
    EngineConfig, ProjectSchedule, ReminderLeadDays, StageCatalog, StageStatus, ValidationError,
    check_calibration, compute_schedule,
};

/// Errors reading or writing the local cache.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// External collaborators owned by the store.
pub struct Collaborators {
    pub remote: Box<dyn RemoteSchedule>,
    pub storage: Box<dyn KeyValueStorage>,
    pub auth: Box<dyn AuthState>,
    pub clock: Box<dyn Clock>,
}

/// What happened to a mutation after it was applied locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The remote confirmed the change.
    Saved,
    /// Kept locally and queued; it will sync later.
    Cached,
    /// The remote confirmed an older version; a newer local change is queued.
    Superseded,
}

impl MutationOutcome {
    pub fn is_saved(self) -> bool {
        self == MutationOutcome::Saved
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MutationOutcome::Saved => "saved",
            MutationOutcome::Cached => "cached",
            MutationOutcome::Superseded => "superseded",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            MutationOutcome::Saved => "saved",
            MutationOutcome::Cached | MutationOutcome::Superseded => "cached, will sync",
        }
    }
}

/// Where the schedule came from on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Remote schedule fetched and applied.
    Remote,
    /// The remote confirmed there is no schedule; local state was cleared.
    NotFound,
    /// Remote unreachable; last known local cache kept.
    LocalCache,
    /// No session; the remote was not consulted.
    LocalOnly,
    /// Local cache was corrupt and the remote payload malformed.
    Degraded,
}

impl LoadSource {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadSource::Remote => "remote",
            LoadSource::NotFound => "not_found",
            LoadSource::LocalCache => "local_cache",
            LoadSource::LocalOnly => "local_only",
            LoadSource::Degraded => "degraded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub source: LoadSource,
    /// The local cache could not be read when the store was opened.
    pub cache_recovered: bool,
    pub remote_error: Option<RemoteError>,
    /// Remote stage ids the catalog does not know (ignored).
    pub unknown_remote_stages: Vec<String>,
}

impl LoadOutcome {
    fn new(source: LoadSource, cache_recovered: bool) -> Self {
        Self {
            source,
            cache_recovered,
            remote_error: None,
            unknown_remote_stages: Vec::new(),
        }
    }

    /// Only a corrupt cache combined with a malformed remote blocks the UI.
    /// Even then `set_start_date` re-initializes cleanly.
    pub fn is_blocking(&self) -> bool {
        self.source == LoadSource::Degraded
    }
}

/// Result of one `sync_pending` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub attempted: usize,
    pub confirmed: usize,
    pub remaining: usize,
    pub skipped_unauthenticated: bool,
}

/// Remote call a ticket stands for, built from the latest local values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushPayload {
    StartDate(NaiveDate),
    /// Only the owed parts are set; at least one of them is.
    Stage {
        stage_id: String,
        status: Option<StageStatus>,
        calibrated_end_date: Option<NaiveDate>,
    },
}

/// Remote acknowledgement matching a `PushPayload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushAck {
    StartDate,
    Stage(RemoteStage),
}

/// One in-flight push, tagged with the queue sequence it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTicket {
    pub key: SyncKey,
    pub seq: u64,
    pub payload: PushPayload,
}

pub struct ReconciliationStore {
    catalog: StageCatalog,
    reminder_lead_days: ReminderLeadDays,
    schedule: ProjectSchedule,
    pending: PendingSyncQueue,
    cache_recovered: bool,
    remote: Box<dyn RemoteSchedule>,
    storage: Box<dyn KeyValueStorage>,
    auth: Box<dyn AuthState>,
    clock: Box<dyn Clock>,
}

impl ReconciliationStore {
    /// Build the store from the local cache only. Call [`Self::load`] to
    /// reconcile with the remote.
    pub fn open(config: EngineConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            remote,
            storage,
            auth,
            clock,
        } = collaborators;
        let schedule = ProjectSchedule::empty(&config.catalog);
        let mut store = Self {
            catalog: config.catalog,
            reminder_lead_days: config.reminder_lead_days,
            schedule,
            pending: PendingSyncQueue::new(),
            cache_recovered: false,
            remote,
            storage,
            auth,
            clock,
        };
        store.hydrate_from_cache();
        store
    }

    /// Give the collaborators back, dropping in-memory state.
    pub fn into_collaborators(self) -> Collaborators {
        Collaborators {
            remote: self.remote,
            storage: self.storage,
            auth: self.auth,
            clock: self.clock,
        }
    }

    fn hydrate_from_cache(&mut self) {
        match self.read_cached_schedule() {
            Ok(Some(schedule)) => self.schedule = schedule,
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "local schedule cache unreadable, starting empty");
                self.cache_recovered = true;
            }
        }

        match self.read_cached_pending() {
            Ok(Some(pending)) => self.pending = pending,
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "pending-sync cache unreadable, queue reset");
                self.cache_recovered = true;
            }
        }

        let orphaned: Vec<String> = self
            .pending
            .stage_entries()
            .filter(|entry| self.catalog.ordinal_of(&entry.stage_id).is_none())
            .map(|entry| entry.stage_id.clone())
            .collect();
        for stage_id in orphaned {
            tracing::warn!(stage_id = %stage_id, "dropping pending entry for stage outside the catalog");
            self.pending.remove_stage(&stage_id);
        }
    }

    fn read_cached_schedule(&self) -> Result<Option<ProjectSchedule>, StoreError> {
        match self.storage.get(SCHEDULE_KEY)? {
            Some(raw) => Ok(Some(decode_schedule(&raw, &self.catalog)?)),
            None => Ok(None),
        }
    }

    fn read_cached_pending(&self) -> Result<Option<PendingSyncQueue>, StoreError> {
        match self.storage.get(PENDING_KEY)? {
            Some(raw) => Ok(Some(decode_pending(&raw)?)),
            None => Ok(None),
        }
    }

    /// Write schedule and queue to local storage.
    pub fn persist(&mut self) -> Result<(), StoreError> {
        let schedule = encode_schedule(&self.schedule)?;
        let pending = encode_pending(&self.pending)?;
        self.storage.set(SCHEDULE_KEY, &schedule)?;
        self.storage.set(PENDING_KEY, &pending)?;
        self.cache_recovered = false;
        Ok(())
    }

    fn persist_or_log(&mut self) {
        if let Err(err) = self.persist() {
            tracing::error!(error = %err, "failed to persist local schedule cache");
        }
    }

    // ── Read side ──

    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    pub fn schedule(&self) -> &ProjectSchedule {
        &self.schedule
    }

    pub fn pending(&self) -> &PendingSyncQueue {
        &self.pending
    }

    pub fn reminder_lead_days(&self) -> ReminderLeadDays {
        self.reminder_lead_days
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn derived_schedule(&self) -> ScheduleView {
        ScheduleView::build(
            &self.catalog,
            &self.schedule,
            &self.pending,
            self.reminder_lead_days,
            self.today(),
        )
    }

    /// Unknown stage ids report locked.
    pub fn is_stage_locked(&self, stage_id: &str) -> bool {
        match self.catalog.ordinal_of(stage_id) {
            Some(ordinal) => machine::is_locked(self.schedule.records(), ordinal),
            None => true,
        }
    }

    pub fn needs_reminder(&self, stage_id: &str) -> bool {
        let Some(ordinal) = self.catalog.ordinal_of(stage_id) else {
            return false;
        };
        let today = self.today();
        let derived = compute_schedule(&self.catalog, &self.schedule, today);
        match (derived.window(ordinal), self.schedule.record(ordinal)) {
            (Some(window), Some(record)) => stagetrack_kernel::needs_reminder(
                window,
                record.status,
                self.reminder_lead_days,
                today,
            ),
            _ => false,
        }
    }

    pub fn has_pending_sync(&self, stage_id: &str) -> bool {
        self.pending.has_stage(stage_id)
    }

    pub fn has_pending_start_date(&self) -> bool {
        self.pending.start_date_entry().is_some()
    }

    // ── User actions ──

    /// (Re)start the project. Clears all stage progress.
    pub fn set_start_date(&mut self, date: NaiveDate) -> Result<MutationOutcome, ValidationError> {
        let today = self.today();
        if date < today {
            return Err(ValidationError::StartDateInPast { date, today });
        }

        self.schedule = ProjectSchedule::started(&self.catalog, date);
        self.pending.record_start_date(date);
        self.persist_or_log();
        tracing::info!(start_date = %date, "project start date set");
        Ok(self.push(SyncKey::StartDate))
    }

    /// Drop the schedule and every queued change. Local only.
    pub fn clear_start_date(&mut self) {
        self.schedule = ProjectSchedule::empty(&self.catalog);
        self.pending.clear();
        self.persist_or_log();
        tracing::info!("project schedule reset");
    }

    pub fn mark_in_progress(&mut self, stage_id: &str) -> Result<MutationOutcome, ValidationError> {
        self.apply_action(stage_id, StageAction::Start)
    }

    pub fn mark_completed(&mut self, stage_id: &str) -> Result<MutationOutcome, ValidationError> {
        self.apply_action(stage_id, StageAction::Complete)
    }

    pub fn mark_rectify(&mut self, stage_id: &str) -> Result<MutationOutcome, ValidationError> {
        self.apply_action(stage_id, StageAction::Rectify)
    }

    pub fn mark_rectify_done(&mut self, stage_id: &str) -> Result<MutationOutcome, ValidationError> {
        self.apply_action(stage_id, StageAction::RectifyDone)
    }

    fn apply_action(
        &mut self,
        stage_id: &str,
        action: StageAction,
    ) -> Result<MutationOutcome, ValidationError> {
        let status = machine::apply_transition(&self.catalog, &mut self.schedule, stage_id, action)?;
        self.pending.record_status(stage_id, status);
        self.persist_or_log();
        tracing::debug!(stage_id, %action, %status, "stage status changed locally");
        Ok(self.push(SyncKey::Stage(stage_id.to_string())))
    }

    /// Override the computed end date of one stage.
    pub fn calibrate_end_date(
        &mut self,
        stage_id: &str,
        end_date: NaiveDate,
    ) -> Result<MutationOutcome, ValidationError> {
        let today = self.today();
        let ordinal = check_calibration(&self.catalog, &self.schedule, stage_id, end_date, today)?;
        let record = self
            .schedule
            .record_mut(ordinal)
            .ok_or_else(|| ValidationError::UnknownStage(stage_id.to_string()))?;
        record.calibrated_end_date = Some(end_date);

        self.pending.record_calibration(stage_id, end_date);
        self.persist_or_log();
        tracing::debug!(stage_id, end_date = %end_date, "stage end date calibrated locally");
        Ok(self.push(SyncKey::Stage(stage_id.to_string())))
    }

    // ── Remote push ──

    fn push(&mut self, key: SyncKey) -> MutationOutcome {
        // Stage changes belong to the current start date; the remote must see it first.
        if matches!(key, SyncKey::Stage(_))
            && self.has_pending_start_date()
            && !self.push(SyncKey::StartDate).is_saved()
        {
            tracing::debug!(key = %key, "start date not confirmed, stage change kept queued");
            return MutationOutcome::Cached;
        }

        let Some(ticket) = self.begin_push(&key) else {
            tracing::debug!(key = %key, "change not pushable now, kept for later sync");
            return MutationOutcome::Cached;
        };
        let result = self.dispatch(&ticket.payload);
        self.complete_push(ticket, result)
    }

    /// Build the remote call for `key` from the latest local values.
    ///
    /// `None` when there is no session or nothing is queued under `key`. A
    /// stage key also yields `None` while a start date is queued: that push
    /// resets every remote stage and has to land first.
    pub fn begin_push(&self, key: &SyncKey) -> Option<PushTicket> {
        if !self.auth.is_authenticated() {
            return None;
        }
        let seq = self.pending.seq_of(key)?;
        let payload = match key {
            SyncKey::StartDate => PushPayload::StartDate(self.schedule.start_date()?),
            SyncKey::Stage(_) if self.has_pending_start_date() => return None,
            SyncKey::Stage(stage_id) => {
                let record = self.schedule.record_by_id(stage_id)?;
                let entry = self.pending.stage_entry(stage_id)?;
                let status = entry.intended_status.map(|_| record.status);
                let calibrated_end_date =
                    entry.calibrated_end_date.and(record.calibrated_end_date);
                if status.is_none() && calibrated_end_date.is_none() {
                    return None;
                }
                PushPayload::Stage {
                    stage_id: stage_id.clone(),
                    status,
                    calibrated_end_date,
                }
            }
        };
        Some(PushTicket {
            key: key.clone(),
            seq,
            payload,
        })
    }

    fn dispatch(&mut self, payload: &PushPayload) -> Result<PushAck, RemoteError> {
        match payload {
            PushPayload::StartDate(date) => {
                self.remote.set_start_date(*date)?;
                Ok(PushAck::StartDate)
            }
            PushPayload::Stage {
                stage_id,
                status,
                calibrated_end_date,
            } => {
                let mut ack = None;
                if let Some(status) = status {
                    ack = Some(self.remote.update_stage_status(stage_id, *status)?);
                }
                if let Some(end_date) = calibrated_end_date {
                    ack = Some(self.remote.calibrate_stage_end(stage_id, *end_date)?);
                }
                ack.map(PushAck::Stage).ok_or_else(|| {
                    RemoteError::Malformed(format!("empty push for stage {stage_id}"))
                })
            }
        }
    }

    /// Apply the outcome of a push started with [`Self::begin_push`].
    ///
    /// A confirmation only lands if the queue entry still carries the
    /// ticket's sequence; otherwise a newer local change is waiting and the
    /// response is dropped.
    pub fn complete_push(
        &mut self,
        ticket: PushTicket,
        result: Result<PushAck, RemoteError>,
    ) -> MutationOutcome {
        let ack = match result {
            Ok(ack) => ack,
            Err(err) => {
                tracing::warn!(key = %ticket.key, error = %err, "remote push failed, change queued");
                return MutationOutcome::Cached;
            }
        };

        let remote_stage = match (&ticket.key, ack) {
            (SyncKey::StartDate, PushAck::StartDate) => None,
            (SyncKey::Stage(_), PushAck::Stage(remote)) => Some(remote),
            (key, _) => {
                tracing::warn!(key = %key, "remote acknowledgement does not match the push");
                return MutationOutcome::Cached;
            }
        };

        if !self.pending.confirm(&ticket.key, ticket.seq) {
            tracing::debug!(key = %ticket.key, seq = ticket.seq, "ignoring stale remote confirmation");
            return MutationOutcome::Superseded;
        }

        if let (SyncKey::Stage(stage_id), Some(remote)) = (&ticket.key, remote_stage) {
            self.apply_confirmed_stage(stage_id, &remote);
        }
        self.persist_or_log();
        tracing::info!(key = %ticket.key, "remote confirmed change");
        MutationOutcome::Saved
    }

    fn apply_confirmed_stage(&mut self, stage_id: &str, remote: &RemoteStage) {
        let Some(ordinal) = self.catalog.ordinal_of(stage_id) else {
            return;
        };
        if let Some(record) = self.schedule.record(ordinal)
            && record.status != remote.status
        {
            tracing::debug!(
                stage_id,
                local = %record.status,
                remote = %remote.status,
                "remote overrode local status"
            );
        }
        machine::set_status(&mut self.schedule, ordinal, remote.status);
        if let Some(record) = self.schedule.record_mut(ordinal) {
            record.calibrated_end_date = remote.end_date;
            record.locked_override = remote.locked;
        }
    }

    /// Retry queued changes: start date first, then stages in order.
    ///
    /// Stops at the first failure; the rest stay queued for the next attempt.
    pub fn sync_pending(&mut self) -> SyncReport {
        let mut report = SyncReport::default();
        if !self.auth.is_authenticated() {
            report.skipped_unauthenticated = true;
            report.remaining = self.pending.len();
            return report;
        }

        let mut keys = Vec::new();
        if self.pending.start_date_entry().is_some() {
            keys.push(SyncKey::StartDate);
        }
        keys.extend(
            self.catalog
                .stages()
                .iter()
                .filter(|stage| self.pending.has_stage(&stage.id))
                .map(|stage| SyncKey::Stage(stage.id.clone())),
        );

        for key in keys {
            let Some(ticket) = self.begin_push(&key) else {
                continue;
            };
            report.attempted += 1;
            let result = self.dispatch(&ticket.payload);
            let failed = result.is_err();
            if self.complete_push(ticket, result).is_saved() {
                report.confirmed += 1;
            }
            if failed {
                break;
            }
        }

        report.remaining = self.pending.len();
        report
    }

    pub fn notify_connectivity_changed(&mut self) -> SyncReport {
        self.sync_pending()
    }

    pub fn notify_auth_changed(&mut self) -> SyncReport {
        self.sync_pending()
    }

    // ── Load ──

    /// Reconcile with the remote authority.
    ///
    /// Queued changes are flushed first. A fetched schedule then replaces
    /// local state, except for stages whose change is still queued.
    pub fn load(&mut self) -> LoadOutcome {
        if !self.auth.is_authenticated() {
            return LoadOutcome::new(LoadSource::LocalOnly, self.cache_recovered);
        }

        self.sync_pending();
        let cache_recovered = self.cache_recovered;
        match self.remote.fetch_schedule() {
            Ok(snapshot) => {
                let unknown = self.apply_remote_snapshot(snapshot);
                let mut outcome = LoadOutcome::new(LoadSource::Remote, cache_recovered);
                outcome.unknown_remote_stages = unknown;
                outcome
            }
            Err(RemoteError::NotFound) if self.has_pending_start_date() => {
                tracing::warn!("remote has no schedule while a local start date is queued");
                let mut outcome = LoadOutcome::new(LoadSource::LocalCache, cache_recovered);
                outcome.remote_error = Some(RemoteError::NotFound);
                outcome
            }
            Err(RemoteError::NotFound) => {
                self.schedule = ProjectSchedule::empty(&self.catalog);
                self.pending.clear();
                self.persist_or_log();
                tracing::info!("remote has no schedule, local state cleared");
                LoadOutcome::new(LoadSource::NotFound, cache_recovered)
            }
            Err(err @ RemoteError::Malformed(_)) if cache_recovered => {
                tracing::error!(error = %err, "remote payload malformed and local cache corrupt");
                let mut outcome = LoadOutcome::new(LoadSource::Degraded, cache_recovered);
                outcome.remote_error = Some(err);
                outcome
            }
            Err(err) => {
                tracing::warn!(error = %err, "remote fetch failed, using local cache");
                let mut outcome = LoadOutcome::new(LoadSource::LocalCache, cache_recovered);
                outcome.remote_error = Some(err);
                outcome
            }
        }
    }

    fn apply_remote_snapshot(&mut self, snapshot: RemoteSnapshot) -> Vec<String> {
        if self.has_pending_start_date() {
            tracing::debug!("local start date still queued, remote snapshot not applied");
            return Vec::new();
        }

        let (mut schedule, unknown) = snapshot.to_schedule(&self.catalog);
        if !unknown.is_empty() {
            tracing::warn!(stages = ?unknown, "remote returned stages outside the catalog");
        }

        if schedule.is_started() {
            let queued: Vec<_> = self.pending.stage_entries().cloned().collect();
            for entry in queued {
                let Some(ordinal) = self.catalog.ordinal_of(&entry.stage_id) else {
                    self.pending.remove_stage(&entry.stage_id);
                    continue;
                };
                let confirmed = schedule.record(ordinal).is_some_and(|record| {
                    entry
                        .intended_status
                        .is_none_or(|status| record.status == status)
                        && entry
                            .calibrated_end_date
                            .is_none_or(|date| record.calibrated_end_date == Some(date))
                });
                if confirmed {
                    self.pending.remove_stage(&entry.stage_id);
                    continue;
                }

                tracing::debug!(stage_id = %entry.stage_id, "keeping queued local change over remote value");
                if let Some(status) = entry.intended_status {
                    machine::set_status(&mut schedule, ordinal, status);
                }
                if let Some(date) = entry.calibrated_end_date
                    && let Some(record) = schedule.record_mut(ordinal)
                {
                    record.calibrated_end_date = Some(date);
                }
            }
        } else {
            self.pending.clear();
        }

        self.schedule = schedule;
        self.persist_or_log();
        tracing::info!(start_date = ?self.schedule.start_date(), "remote schedule applied");
        unknown
    }
}
