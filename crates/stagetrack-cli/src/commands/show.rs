use crate::cli::GlobalArgs;
use crate::labels::status_label;
use crate::support::{open_and_load_or_exit, print_json};
use serde_json::json;
use stagetrack_store::ScheduleView;

pub fn run(global: &GlobalArgs) {
    let (store, outcome) = open_and_load_or_exit(global, false);
    let view = store.derived_schedule();

    if global.json {
        print_json(&json!({
            "action": "show",
            "today": store.today(),
            "loadSource": outcome.source.as_str(),
            "cacheRecovered": outcome.cache_recovered,
            "remoteError": outcome.remote_error.as_ref().map(ToString::to_string),
            "unknownRemoteStages": outcome.unknown_remote_stages,
            "labels": stage_labels(&view),
            "schedule": view,
        }));
    } else {
        println!("stagetrack schedule");
        println!("  Today: {}", store.today());
        println!("  Source: {}", outcome.source.as_str());
        if let Some(err) = &outcome.remote_error {
            println!("  Remote: {err}");
        }
        print_schedule(&view);
    }
}

pub fn stage_labels(view: &ScheduleView) -> Vec<&'static str> {
    view.stages
        .iter()
        .map(|stage| status_label(stage.ordinal, stage.status))
        .collect()
}

pub fn print_schedule(view: &ScheduleView) {
    match view.start_date {
        Some(start) if view.start_date_pending_sync => println!("  Start: {start} (pending sync)"),
        Some(start) => println!("  Start: {start}"),
        None => println!("  Start: not set"),
    }
    println!("  Progress: {}%", view.overall_progress_percent);
    if let Some(stage_id) = &view.behind_stage_id {
        println!("  Behind: {stage_id} by {} day(s)", view.days_behind);
    }

    for stage in &view.stages {
        let window = match (stage.start_date, stage.end_date, stage.remaining_days) {
            (Some(start), Some(end), Some(remaining)) => {
                format!(" {start}..{end} ({remaining}d left)")
            }
            _ => String::new(),
        };
        let flags = [
            (stage.locked, "locked"),
            (stage.calibrated, "calibrated"),
            (stage.needs_reminder, "reminder"),
            (stage.pending_sync, "pending sync"),
        ]
        .into_iter()
        .filter_map(|(on, flag)| on.then_some(flag))
        .collect::<Vec<_>>();
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" <{}>", flags.join(", "))
        };
        println!(
            "  - {} {} [{}]{window}{flags}",
            stage.stage_id,
            stage.display_name,
            status_label(stage.ordinal, stage.status)
        );
    }
}
