//! Per-hook aggregation for spotting frequent hooks
//!
//! The report lists every invocation; this rolls them up by (hook, kind)
//! so a cheap hook fired thousands of times is as visible as one slow call.

use crate::registry::HookKind;
use crate::session::LogEntry;
use std::collections::HashMap;

/// Statistics for one hook name and kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookStats {
    pub calls: u64,
    pub total_seconds: f64,
    pub max_seconds: f64,
    /// Calls above the slow threshold
    pub slow_calls: u64,
}

impl HookStats {
    pub fn avg_seconds(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.total_seconds / self.calls as f64
        }
    }
}

/// Summary totals across all hooks
#[derive(Debug, Clone, PartialEq)]
pub struct StatTotals {
    pub total_calls: u64,
    pub total_seconds: f64,
    pub slow_calls: u64,
}

/// Tracks statistics for all hooks
#[derive(Debug, Default)]
pub struct HookStatsTracker {
    stats: HashMap<(String, HookKind), HookStats>,
    slow_threshold_secs: f64,
}

impl HookStatsTracker {
    pub fn new(slow_threshold_secs: f64) -> Self {
        Self {
            stats: HashMap::new(),
            slow_threshold_secs,
        }
    }

    pub fn from_entries(entries: &[LogEntry], slow_threshold_secs: f64) -> Self {
        let mut tracker = Self::new(slow_threshold_secs);
        for entry in entries {
            tracker.record(entry);
        }
        tracker
    }

    pub fn record(&mut self, entry: &LogEntry) {
        let stats = self
            .stats
            .entry((entry.hook_name.clone(), entry.kind))
            .or_default();
        stats.calls += 1;
        stats.total_seconds += entry.duration_seconds;
        stats.max_seconds = stats.max_seconds.max(entry.duration_seconds);
        if entry.duration_seconds > self.slow_threshold_secs {
            stats.slow_calls += 1;
        }
    }

    pub fn get(&self, hook_name: &str, kind: HookKind) -> Option<&HookStats> {
        self.stats.get(&(hook_name.to_string(), kind))
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Rows sorted by total time descending, then by name for stable output
    pub fn sorted(&self) -> Vec<(&str, HookKind, &HookStats)> {
        let mut rows: Vec<_> = self
            .stats
            .iter()
            .map(|((name, kind), stats)| (name.as_str(), *kind, stats))
            .collect();
        rows.sort_by(|a, b| {
            b.2.total_seconds
                .total_cmp(&a.2.total_seconds)
                .then_with(|| a.0.cmp(b.0))
                .then_with(|| a.1.cmp(&b.1))
        });
        rows
    }

    pub fn totals(&self) -> StatTotals {
        self.stats.values().fold(
            StatTotals {
                total_calls: 0,
                total_seconds: 0.0,
                slow_calls: 0,
            },
            |mut acc, s| {
                acc.total_calls += s.calls;
                acc.total_seconds += s.total_seconds;
                acc.slow_calls += s.slow_calls;
                acc
            },
        )
    }

    /// strace -c style table
    pub fn format_summary(&self) -> String {
        if self.stats.is_empty() {
            return "No hooks recorded.\n".to_string();
        }

        let totals = self.totals();
        let mut out = String::new();
        out.push_str("% time     seconds   msecs/call     calls      slow  max ms hook\n");
        out.push_str("------ ----------- ------------ --------- --------- ------- ----------------\n");
        for (name, kind, stats) in self.sorted() {
            let time_percent = if totals.total_seconds > 0.0 {
                stats.total_seconds / totals.total_seconds * 100.0
            } else {
                0.0
            };
            out.push_str(&format!(
                "{:6.2} {:>11.6} {:>12.3} {:>9} {:>9} {:>7.2} {} ({})\n",
                time_percent,
                stats.total_seconds,
                stats.avg_seconds() * 1000.0,
                stats.calls,
                stats.slow_calls,
                stats.max_seconds * 1000.0,
                name,
                kind
            ));
        }
        out.push_str("------ ----------- ------------ --------- --------- ------- ----------------\n");
        out.push_str(&format!(
            "100.00 {:>11.6} {:>12} {:>9} {:>9} {:>7} total\n",
            totals.total_seconds, "", totals.total_calls, totals.slow_calls, ""
        ));
        out
    }
}
