use crate::cli::{GlobalArgs, StageCommands};
use crate::labels::status_label;
use crate::support::{exit_with_error, open_and_load_or_exit, print_json, validation_or_exit};
use serde_json::json;

pub fn run(global: &GlobalArgs, command: StageCommands) {
    let (mut store, _) = open_and_load_or_exit(global, false);

    let (action, stage_id, result) = match command {
        StageCommands::Begin { id } => {
            let result = store.mark_in_progress(&id);
            ("stage.begin", id, result)
        }
        StageCommands::Complete { id } => {
            let result = store.mark_completed(&id);
            ("stage.complete", id, result)
        }
        StageCommands::Rectify { id } => {
            let result = store.mark_rectify(&id);
            ("stage.rectify", id, result)
        }
        StageCommands::RectifyDone { id } => {
            let result = store.mark_rectify_done(&id);
            ("stage.rectify_done", id, result)
        }
        StageCommands::Calibrate { id, date } => {
            let result = store.calibrate_end_date(&id, date);
            ("stage.calibrate", id, result)
        }
    };
    let outcome = validation_or_exit(result);

    let view = store.derived_schedule();
    let Some(stage) = view.stage(&stage_id) else {
        exit_with_error(format!("unknown stage: {stage_id}"));
    };
    let label = status_label(stage.ordinal, stage.status);

    if global.json {
        print_json(&json!({
            "action": action,
            "stageId": stage.stage_id,
            "status": stage.status,
            "label": label,
            "outcome": outcome.as_str(),
            "pendingSync": stage.pending_sync,
            "startDate": stage.start_date,
            "endDate": stage.end_date,
            "progressPercent": view.overall_progress_percent,
        }));
    } else {
        println!(
            "stagetrack {action}\n  Stage: {} {}\n  Status: {label}\n  Sync: {}",
            stage.stage_id,
            stage.display_name,
            outcome.message()
        );
        if let (Some(start), Some(end)) = (stage.start_date, stage.end_date) {
            println!("  Window: {start}..{end}");
        }
    }
}
