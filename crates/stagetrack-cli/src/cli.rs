use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "stagetrack",
    about = "Stagetrack: six-stage renovation schedule with offline-tolerant sync",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the engine config (TOML); defaults apply when absent
    #[arg(long, global = true, default_value = "stagetrack.toml")]
    pub config: String,

    /// Directory holding the local schedule cache
    #[arg(long, global = true, default_value = ".stagetrack")]
    pub data_dir: String,

    /// Directory acting as the remote authority (schedule.json)
    #[arg(long, global = true)]
    pub remote_dir: Option<String>,

    /// Session token; without one the remote is never contacted
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Override today's date (YYYY-MM-DD)
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile with the remote and print the derived schedule
    Show,

    /// Print the configured stage catalog
    Catalog,

    /// Set (or reset) the project start date
    Start {
        /// Start date (YYYY-MM-DD), today or later
        date: NaiveDate,
    },

    /// Drop the local schedule and every queued change
    Reset,

    /// Stage status and calibration actions
    Stage {
        #[command(subcommand)]
        command: StageCommands,
    },

    /// Push queued changes, then reconcile with the remote
    Sync,
}

#[derive(Subcommand)]
pub enum StageCommands {
    /// Mark a pending stage in progress
    Begin {
        /// Stage ID (e.g. S01)
        id: String,
    },

    /// Mark a stage completed
    Complete {
        /// Stage ID
        id: String,
    },

    /// Send a stage back for rectification
    Rectify {
        /// Stage ID
        id: String,
    },

    /// Accept the rectification of a stage
    RectifyDone {
        /// Stage ID
        id: String,
    },

    /// Override a stage's computed end date
    Calibrate {
        /// Stage ID
        id: String,

        /// New end date (YYYY-MM-DD), after the stage start and not before today
        date: NaiveDate,
    },
}
