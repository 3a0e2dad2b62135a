//! monthgrid CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use monthgrid_core::init_tracing;
use monthgrid_demo::cli::{Cli, Command, ConfigAction};
use monthgrid_demo::commands;
use monthgrid_demo::config::DemoConfig;
use monthgrid_demo::error::DemoResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(config.tracing(cli.debug)) {
        eprintln!("warning: {}", e);
    }

    match run(cli, config).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> DemoResult<DemoConfig> {
    let mut config = match cli.config {
        Some(ref path) => DemoConfig::load_from(path)?,
        None => DemoConfig::load()?,
    };
    config.apply_cli(cli)?;
    Ok(config)
}

async fn run(cli: Cli, config: DemoConfig) -> DemoResult<String> {
    let config_path = cli.config.clone().unwrap_or_else(DemoConfig::default_path);

    match cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => Ok(commands::config::path(&config_path)),
        },
        Some(Command::Day { date }) => commands::day::run(config, &date).await,
        Some(Command::Calendars) => commands::calendars::run(config).await,
        Some(Command::Month { month, count }) => {
            commands::month::run(config, month.as_deref(), count).await
        }
        None => commands::month::run(config, None, 1).await,
    }
}
