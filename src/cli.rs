//! CLI argument parsing for hookmon

use crate::config::{MonitorConfig, DEFAULT_SLOW_THRESHOLD_SECS};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for hook reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
    /// Standalone HTML page
    Html,
}

#[derive(Parser, Debug)]
#[command(name = "hookmon")]
#[command(version)]
#[command(about = "Replay a hook scenario under instrumentation and report slow hooks", long_about = None)]
pub struct Cli {
    /// Scenario file (JSON) describing hooks and the dispatch script
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Entries above this many seconds are flagged slow
    #[arg(long = "slow-threshold", value_name = "SECS", default_value_t = DEFAULT_SLOW_THRESHOLD_SECS)]
    pub slow_threshold: f64,

    /// Only show the N slowest entries
    #[arg(long = "top", value_name = "N")]
    pub top: Option<usize>,

    /// HTML template with a {{rows}} placeholder (requires --format html)
    #[arg(long = "template", value_name = "PATH")]
    pub template: Option<PathBuf>,

    /// Show per-hook aggregation instead of individual entries
    #[arg(short = 'c', long = "summary")]
    pub summary: bool,

    /// Skip caller attribution (no stack walking)
    #[arg(long = "no-caller")]
    pub no_caller: bool,

    /// Advance a simulated clock instead of sleeping; durations become exact
    #[arg(long = "simulate")]
    pub simulate: bool,

    /// Measure the recorder's own overhead
    #[arg(long = "profile-self")]
    pub profile_self: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    pub fn monitor_config(&self) -> MonitorConfig {
        let config = MonitorConfig::default().with_slow_threshold(self.slow_threshold);
        if self.no_caller {
            config.without_callers()
        } else {
            config
        }
    }
}
