//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// monthgrid - a month view over your calendar, loaded one month at a time
#[derive(Debug, Parser)]
#[command(name = "monthgrid")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "MONTHGRID_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log format (pretty, compact or json)
    #[arg(long)]
    pub log_format: Option<String>,

    // --- Source flags ---
    /// Read events from this iCalendar file instead of the built-in sample
    #[arg(long, env = "MONTHGRID_ICS")]
    pub ics: Option<PathBuf>,

    /// IANA time zone used for days and months (default UTC)
    #[arg(long, short = 'z', env = "MONTHGRID_TIMEZONE")]
    pub timezone: Option<String>,

    /// Only show these sub-calendars (can be repeated)
    #[arg(long = "calendar", action = clap::ArgAction::Append)]
    pub calendars: Vec<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print a month grid (the default)
    Month {
        /// Month to show, as YYYY-MM (default: current month)
        #[arg(long, short)]
        month: Option<String>,

        /// Number of consecutive months to print
        #[arg(long, default_value_t = 1)]
        count: u32,
    },

    /// List the events of one day
    Day {
        /// Day to list, as YYYY-MM-DD
        date: String,
    },

    /// List the sub-calendars of the event source
    Calendars,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Dump,
    /// Check the configuration
    Validate,
    /// Show the configuration file path
    Path,
}
