//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "charge", version, about = "Target-time charge planner")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/charge_config.toml")]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides `logging.level`
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Target SoC and deadline; falls back to `[target]` in the config.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Target state of charge in percent (0..=100)
    #[arg(long, value_name = "PERCENT", value_parser = clap::value_parser!(u8).range(0..=100))]
    pub soc: Option<u8>,
    /// Deadline as RFC 3339, e.g. 2025-10-14T07:00:00Z
    #[arg(long, value_name = "TIME", conflicts_with = "in_minutes")]
    pub at: Option<chrono::DateTime<chrono::Utc>>,
    /// Deadline relative to now
    #[arg(long, value_name = "MIN")]
    pub in_minutes: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate once whether charging must start now to meet the target
    Plan {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Run the scheduler against the simulated vehicle until the deadline passes
    Simulate {
        #[command(flatten)]
        target: TargetArgs,
        /// Stop after this many ticks (0 = until the deadline passes)
        #[arg(long, value_name = "N", default_value_t = 0)]
        max_ticks: u64,
        /// Sleep for each tick before advancing the simulated clock
        #[arg(long, action = ArgAction::SetTrue)]
        realtime: bool,
    },
    /// Quick check that the config builds a working scheduler
    SelfCheck,
    /// Health check for operational monitoring
    Health,
}
