//! Layered CLI
//!
//! Command-line interface for replaying override scripts.

use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::info;

use layered::cli::commands;
use layered::cli::script::ReplayOptions;
use layered::cli::{Cli, Commands};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Layered v{}", env!("CARGO_PKG_VERSION"));

    let report = match cli.command {
        Some(Commands::Replay { path, keep_going }) => {
            commands::replay_script(&path, &ReplayOptions { keep_going }, cli.format)?
        }
        Some(Commands::Demo) => commands::demo(cli.format)?,
        None => {
            println!("Layered v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            return Ok(ExitCode::SUCCESS);
        }
    };

    if report.failed_steps() > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
