use crate::cli::GlobalArgs;
use crate::remote::FileRemote;
use serde::Serialize;
use stagetrack_kernel::{EngineConfig, ValidationError};
use stagetrack_store::{
    Clock, Collaborators, DetachedRemote, FileStorage, FixedClock, LoadOutcome, LoadSource,
    ReconciliationStore, RemoteSchedule, StaticAuth, SystemClock,
};

pub fn exit_with_error(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

pub fn load_config_or_exit(path: &str) -> EngineConfig {
    EngineConfig::load_or_default(path).unwrap_or_else(|e| exit_with_error(e))
}

pub fn open_store_or_exit(global: &GlobalArgs) -> ReconciliationStore {
    let config = load_config_or_exit(&global.config);

    let remote: Box<dyn RemoteSchedule> = match &global.remote_dir {
        Some(dir) => Box::new(FileRemote::new(dir, config.catalog.clone())),
        None => Box::new(DetachedRemote),
    };
    let authenticated = global.token.as_ref().is_some_and(|t| !t.trim().is_empty());
    tracing::debug!(
        data_dir = %global.data_dir,
        remote_dir = ?global.remote_dir,
        authenticated,
        "opening schedule store"
    );
    let clock: Box<dyn Clock> = match global.today {
        Some(today) => Box::new(FixedClock(today)),
        None => Box::new(SystemClock),
    };

    ReconciliationStore::open(
        config,
        Collaborators {
            remote,
            storage: Box::new(FileStorage::new(&global.data_dir)),
            auth: Box::new(StaticAuth(authenticated)),
            clock,
        },
    )
}

/// Open the store and reconcile with the remote.
///
/// A degraded load stops every command except those that re-initialize the
/// schedule (`allow_degraded`).
pub fn open_and_load_or_exit(
    global: &GlobalArgs,
    allow_degraded: bool,
) -> (ReconciliationStore, LoadOutcome) {
    let mut store = open_store_or_exit(global);
    let outcome = store.load();
    if outcome.is_blocking() && !allow_degraded {
        exit_with_error(
            "local cache and remote schedule are both unreadable; run `stagetrack start <date>` to re-initialize",
        );
    }
    if outcome.cache_recovered && outcome.source != LoadSource::Degraded {
        eprintln!("warning: local cache was unreadable and has been reset");
    }
    (store, outcome)
}

pub fn validation_or_exit<T>(result: Result<T, ValidationError>) -> T {
    result.unwrap_or_else(|e| exit_with_error(e))
}

pub fn print_json<T: Serialize>(payload: &T) {
    match serde_json::to_string_pretty(payload) {
        Ok(raw) => println!("{raw}"),
        Err(e) => exit_with_error(format!("json serialization failed: {e}")),
    }
}
