//! Report building: sort the hook log and shape it for renderers

use crate::session::LogEntry;
use std::fmt::Write as _;

/// Entries sorted by duration, slowest first
///
/// Stable: entries with equal durations keep their dispatch order.
///
/// # Example
/// ```
/// use hookmon::report::build_report;
///
/// assert!(build_report(&[]).is_empty());
/// ```
pub fn build_report(entries: &[LogEntry]) -> Vec<LogEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| b.duration_seconds.total_cmp(&a.duration_seconds));
    sorted
}

/// Milliseconds rounded to two decimals
pub fn display_ms(duration_seconds: f64) -> f64 {
    (duration_seconds * 1000.0 * 100.0).round() / 100.0
}

/// One presentation-ready line of the report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub hook: String,
    pub kind: String,
    pub display_ms: f64,
    pub is_slow: bool,
    pub caller: String,
}

impl ReportRow {
    pub fn from_entry(entry: &LogEntry, slow_threshold_secs: f64) -> Self {
        Self {
            hook: entry.hook_name.clone(),
            kind: entry.kind.to_string(),
            display_ms: display_ms(entry.duration_seconds),
            is_slow: entry.duration_seconds > slow_threshold_secs,
            caller: entry.caller.to_string(),
        }
    }

    /// `12.34 ms`
    pub fn formatted_ms(&self) -> String {
        format!("{:.2} ms", self.display_ms)
    }
}

/// Sorted, formatted rows; `top` keeps only the slowest N
pub fn report_rows(entries: &[LogEntry], slow_threshold_secs: f64, top: Option<usize>) -> Vec<ReportRow> {
    build_report(entries)
        .iter()
        .take(top.unwrap_or(usize::MAX))
        .map(|entry| ReportRow::from_entry(entry, slow_threshold_secs))
        .collect()
}

/// Plain-text table of the rows
pub fn format_text(rows: &[ReportRow]) -> String {
    let mut out = String::new();
    if rows.is_empty() {
        out.push_str("No hooks recorded.\n");
        return out;
    }

    let slow = rows.iter().filter(|r| r.is_slow).count();
    let _ = writeln!(out, "╔════════════════════════════════════════════════════════════════════════════════╗");
    let _ = writeln!(out, "║  Hooks Log (sorted by execution time)                                          ║");
    let _ = writeln!(out, "╚════════════════════════════════════════════════════════════════════════════════╝");
    let _ = writeln!(out, "{:<40} {:>7} {:>14}  {}", "Hook", "Type", "Time", "Caller");
    let _ = writeln!(out, "{}", "─".repeat(88));
    for row in rows {
        let marker = if row.is_slow { " *" } else { "" };
        let _ = writeln!(
            out,
            "{:<40} {:>7} {:>14}  {}{}",
            row.hook,
            row.kind,
            row.formatted_ms(),
            row.caller,
            marker
        );
    }
    let _ = writeln!(out, "{}", "─".repeat(88));
    let _ = writeln!(out, "{} entries, {} slow (*)", rows.len(), slow);
    out
}
