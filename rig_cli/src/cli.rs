//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "rig", version, about = "Load-frame test rig")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/rig_config.toml")]
    pub config: PathBuf,

    /// Optional calibration CSV (strict `volts,force` header); overrides the config cal factor
    #[arg(long, value_name = "FILE")]
    pub calibration: Option<PathBuf>,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Log level (error|warn|info|debug|trace); overrides `[logging] level`, default info
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Live force/travel session with jog control, test recording, and export
    Run {
        /// Run sampling and jog handling on separate threads (overrides runner.mode)
        #[arg(long, action = ArgAction::SetTrue)]
        threaded: bool,
        /// Do not read the keyboard; run until Ctrl-C or --ticks
        #[arg(long, action = ArgAction::SetTrue)]
        no_keys: bool,
        /// Stop after this many sampling ticks
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Directory for exported CSV/PNG files (overrides export.dir)
        #[arg(long, value_name = "DIR")]
        export_dir: Option<PathBuf>,
        /// Record the whole session as one test and export it on exit
        #[arg(long, action = ArgAction::SetTrue)]
        record: bool,
    },
    /// Jog the motor without reading the force channel
    Jog,
    /// Fit a calibration CSV and print the resulting cal factor
    Calibrate {
        /// CSV with `volts,force` rows
        #[arg(value_name = "CSV")]
        csv: PathBuf,
    },
    /// Quick health check (hardware presence / sim ok)
    SelfCheck,
}
