use crate::cli::GlobalArgs;
use crate::commands::show::{print_schedule, stage_labels};
use crate::support::{open_and_load_or_exit, print_json, validation_or_exit};
use chrono::NaiveDate;
use serde_json::json;

pub fn run(global: &GlobalArgs, date: NaiveDate) {
    let (mut store, _) = open_and_load_or_exit(global, true);
    let outcome = validation_or_exit(store.set_start_date(date));
    let view = store.derived_schedule();

    if global.json {
        print_json(&json!({
            "action": "start",
            "startDate": date,
            "outcome": outcome.as_str(),
            "labels": stage_labels(&view),
            "schedule": view,
        }));
    } else {
        println!("stagetrack start ({})", outcome.message());
        print_schedule(&view);
    }
}
