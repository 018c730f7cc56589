//! JSON output format for hook reports

use crate::session::LogEntry;
use serde::{Deserialize, Serialize};

/// Summary statistics for the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSummary {
    pub total_entries: u64,
    pub total_time_seconds: f64,
    /// Entries above the slow threshold
    pub slow_entries: u64,
    pub slow_threshold_seconds: f64,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    /// Entries, slowest first
    pub hooks: Vec<LogEntry>,
    pub summary: JsonSummary,
}

impl JsonOutput {
    pub fn new(slow_threshold_seconds: f64) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "hookmon-json-v1".to_string(),
            hooks: Vec::new(),
            summary: JsonSummary {
                total_entries: 0,
                total_time_seconds: 0.0,
                slow_entries: 0,
                slow_threshold_seconds,
            },
        }
    }

    /// Build from an already sorted report
    pub fn from_report(report: Vec<LogEntry>, slow_threshold_seconds: f64) -> Self {
        let mut output = Self::new(slow_threshold_seconds);
        for entry in report {
            output.add_entry(entry);
        }
        output
    }

    pub fn add_entry(&mut self, entry: LogEntry) {
        self.summary.total_entries += 1;
        self.summary.total_time_seconds += entry.duration_seconds;
        if entry.duration_seconds > self.summary.slow_threshold_seconds {
            self.summary.slow_entries += 1;
        }
        self.hooks.push(entry);
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
