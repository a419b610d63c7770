use crate::cli::GlobalArgs;
use crate::support::{open_store_or_exit, print_json};
use serde_json::json;

pub fn run(global: &GlobalArgs) {
    let mut store = open_store_or_exit(global);
    let report = store.sync_pending();
    let outcome = store.load();

    if global.json {
        print_json(&json!({
            "action": "sync",
            "attempted": report.attempted,
            "confirmed": report.confirmed,
            "remaining": store.pending().len(),
            "skippedUnauthenticated": report.skipped_unauthenticated,
            "loadSource": outcome.source.as_str(),
            "remoteError": outcome.remote_error.as_ref().map(ToString::to_string),
        }));
    } else {
        println!(
            "stagetrack sync\n  Attempted: {}\n  Confirmed: {}\n  Remaining: {}\n  Source: {}",
            report.attempted,
            report.confirmed,
            store.pending().len(),
            outcome.source.as_str()
        );
        if report.skipped_unauthenticated {
            println!("  No session: pass --token to push queued changes");
        }
    }
}
