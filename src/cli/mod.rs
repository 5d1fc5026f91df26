//! CLI Module
//!
//! Command-line interface for replaying override scripts.

pub mod commands;
pub mod script;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Layered - replay override scripts against a layered value
#[derive(Parser, Debug)]
#[command(name = "layered")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// How replay reports are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a JSON override script
    #[command(name = "replay")]
    Replay {
        /// Path to the script
        path: PathBuf,

        /// Continue past rejected steps
        #[arg(short, long)]
        keep_going: bool,
    },

    /// Replay the built-in two-override walkthrough
    #[command(name = "demo")]
    Demo,
}
