//! reqledger CLI: the `reqledger` command.

mod cli;
mod commands;
mod config;
mod logging;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use config::{Config, Overrides};
use std::path::Path;
use support::{Settings, exit_with_error};

fn main() {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref().map(Path::new))
        .unwrap_or_else(|e| exit_with_error(e))
        .with_overrides(Overrides {
            ledger: cli.ledger,
            events: cli.events,
            log_level: cli.log_level,
            log_format: cli.log_format,
        });
    logging::init_subscriber(&config.logging.level, config.logging.format);

    let settings = Settings {
        ledger_path: config.ledger_path(),
        events_path: config.events_path(),
    };
    tracing::debug!(
        ledger = %settings.ledger_path.display(),
        events = %settings.events_path.display(),
        "configuration resolved"
    );

    match cli.command {
        Commands::Init { path, json } => commands::init::run(path, json),

        Commands::Asset { command } => commands::asset::run(command, &settings),

        Commands::Dep { command } => commands::dep::run(command, &settings),

        Commands::Invoke {
            operation,
            payload,
            evaluate,
        } => commands::invoke::run(operation, payload, evaluate, &settings),

        Commands::Events { name, json } => commands::events::run(name, json, &settings),
    }
}
