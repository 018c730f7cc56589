//! Monitor configuration

use serde::{Deserialize, Serialize};

/// Default slow-hook threshold in seconds
pub const DEFAULT_SLOW_THRESHOLD_SECS: f64 = 0.1;

/// Default query parameter that requests a monitoring run
pub const DEFAULT_TRIGGER_PARAM: &str = "hook_monitor";

/// Settings shared by the session, the trigger, and the renderers
///
/// # Example
/// ```
/// use hookmon::config::MonitorConfig;
///
/// let config = MonitorConfig::default();
/// assert_eq!(config.slow_threshold_secs, 0.1);
/// assert!(config.resolve_callers);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Entries strictly above this duration are flagged slow
    pub slow_threshold_secs: f64,

    /// Extra frames the caller resolver skips past the recorder's own
    pub caller_skip_frames: usize,

    /// Walk the stack on every exit; off trades attribution for overhead
    pub resolve_callers: bool,

    /// Additional symbol prefixes treated as dispatcher internals
    pub ignored_prefixes: Vec<String>,

    /// Query parameter that requests a run
    pub trigger_param: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            slow_threshold_secs: DEFAULT_SLOW_THRESHOLD_SECS,
            caller_skip_frames: 0,
            resolve_callers: true,
            ignored_prefixes: Vec::new(),
            trigger_param: DEFAULT_TRIGGER_PARAM.to_string(),
        }
    }
}

impl MonitorConfig {
    pub fn with_slow_threshold(mut self, secs: f64) -> Self {
        self.slow_threshold_secs = secs;
        self
    }

    pub fn without_callers(mut self) -> Self {
        self.resolve_callers = false;
        self
    }

    /// Whether `duration_seconds` counts as slow under this config
    pub fn is_slow(&self, duration_seconds: f64) -> bool {
        duration_seconds > self.slow_threshold_secs
    }
}
