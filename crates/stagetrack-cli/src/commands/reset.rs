use crate::cli::GlobalArgs;
use crate::support::{open_store_or_exit, print_json};
use serde_json::json;

pub fn run(global: &GlobalArgs) {
    let mut store = open_store_or_exit(global);
    store.clear_start_date();

    if global.json {
        print_json(&json!({
            "action": "reset",
            "dataDir": global.data_dir,
        }));
    } else {
        println!("stagetrack reset\n  Local schedule and queued changes dropped");
    }
}
