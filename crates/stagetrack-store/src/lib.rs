//! # Stagetrack Store
//!
//! Owns a project's schedule across three sources of truth: the in-memory
//! state, the local key/value cache and the remote authority.
//!
//! ```text
//! ReconciliationStore
//!     ├── storage   KeyValueStorage (MemoryStorage, FileStorage)
//!     ├── cache     schedule + pending-sync records
//!     ├── pending   per-stage queue with sequence numbers
//!     ├── remote    RemoteSchedule + AuthState
//!     └── view      ScheduleView for front-ends
//! ```
//!
//! The remote always wins on load, except for changes still waiting in the
//! pending-sync queue.

pub mod cache;
pub mod clock;
pub mod pending;
pub mod reconcile;
pub mod remote;
pub mod storage;
pub mod view;

pub use cache::{CACHE_SCHEMA, CacheError, CacheRecord, PENDING_KEY, SCHEDULE_KEY};
pub use clock::{Clock, FixedClock, SystemClock};
pub use pending::{PendingStartDate, PendingSyncEntry, PendingSyncQueue, SyncKey};
pub use reconcile::{
    Collaborators, LoadOutcome, LoadSource, MutationOutcome, PushAck, PushPayload, PushTicket,
    ReconciliationStore, StoreError, SyncReport,
};
pub use remote::{
    AuthState, DetachedRemote, RemoteError, RemoteSchedule, RemoteSnapshot, RemoteStage,
    StaticAuth,
};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use view::{ScheduleView, StageView};
