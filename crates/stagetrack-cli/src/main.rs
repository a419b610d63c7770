//! Stagetrack CLI: the `stagetrack` command.

mod cli;
mod commands;
mod labels;
mod remote;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("STAGETRACK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let global = cli.global;

    match cli.command {
        Commands::Show => commands::show::run(&global),
        Commands::Catalog => commands::catalog::run(&global),
        Commands::Start { date } => commands::start::run(&global, date),
        Commands::Reset => commands::reset::run(&global),
        Commands::Stage { command } => commands::stage::run(&global, command),
        Commands::Sync => commands::sync::run(&global),
    }
}
