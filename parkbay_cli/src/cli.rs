//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "parkbay", version, about = "Parking bay position and sensor fusion")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/parkbay.toml")]
    pub config: PathBuf,

    /// Emit JSON lines (reports, logs and errors) instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); defaults to logging.level, then info
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate the config, build the bay and list its triggers
    Check,
    /// Run the bay against a recorded CSV script (cycle,kind,key,value)
    Replay {
        /// Script with `reading`, `message` and `status` rows
        #[arg(long, value_name = "FILE")]
        readings: PathBuf,
        /// Sleep this long between cycles (wall clock); simulated time always advances by system.cycle_ms
        #[arg(long, value_name = "MS")]
        pace_ms: Option<u64>,
        /// Mark every bay sensor online before the first cycle
        #[arg(long, action = ArgAction::SetTrue)]
        online: bool,
    },
}
