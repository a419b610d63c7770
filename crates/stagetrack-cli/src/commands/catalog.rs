use crate::cli::GlobalArgs;
use crate::support::{load_config_or_exit, print_json};
use serde_json::json;

pub fn run(global: &GlobalArgs) {
    let config = load_config_or_exit(&global.config);
    let catalog = &config.catalog;

    if global.json {
        let stages = catalog
            .stages()
            .iter()
            .enumerate()
            .map(|(ordinal, stage)| {
                json!({
                    "ordinal": ordinal,
                    "id": stage.id,
                    "name": stage.display_name,
                    "durationDays": stage.nominal_duration_days,
                })
            })
            .collect::<Vec<_>>();
        print_json(&json!({
            "action": "catalog",
            "configPath": global.config,
            "reminderLeadDays": config.reminder_lead_days.days(),
            "totalNominalDays": catalog.total_nominal_days(),
            "stages": stages,
        }));
    } else {
        println!(
            "stagetrack catalog\n  Reminder lead: {} day(s)\n  Nominal total: {} day(s)",
            config.reminder_lead_days.days(),
            catalog.total_nominal_days()
        );
        for stage in catalog.stages() {
            println!(
                "  - {} {} ({}d)",
                stage.id, stage.display_name, stage.nominal_duration_days
            );
        }
    }
}
