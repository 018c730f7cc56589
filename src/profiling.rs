//! Self-profiling of recorder overhead
//!
//! Every instrumented dispatch pays for two extra callbacks, a stack push,
//! and on exit a stack walk plus a log append. This module accounts for
//! that cost so `--profile-self` can show what monitoring itself added.

use std::time::{Duration, Instant};

/// Categories of recorder work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfilingCategory {
    /// Entry wrapper: clock read and pending-stack push
    EntryWrap,
    /// Exit wrapper minus caller resolution: pop, duration, append
    ExitWrap,
    /// Stack walking for caller attribution
    CallerResolution,
    /// Report sorting and formatting
    Rendering,
}

/// Accumulated recorder overhead
#[derive(Debug, Default)]
pub struct ProfilingContext {
    /// Number of exit wrappers that appended an entry
    entries_logged: u64,
    entry_time: Duration,
    exit_time: Duration,
    caller_time: Duration,
    render_time: Duration,
    /// Total wall clock time
    start_time: Option<Instant>,
}

impl ProfilingContext {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_entry_logged(&mut self) {
        self.entries_logged += 1;
    }

    /// Measure the time taken by an operation
    ///
    /// # Example
    /// ```
    /// use hookmon::profiling::{ProfilingContext, ProfilingCategory};
    ///
    /// let mut ctx = ProfilingContext::new();
    /// let result = ctx.measure(ProfilingCategory::Rendering, || {
    ///     format!("test")
    /// });
    /// assert_eq!(result, "test");
    /// ```
    pub fn measure<F, R>(&mut self, category: ProfilingCategory, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.record_time(category, start.elapsed());
        result
    }

    pub fn record_time(&mut self, category: ProfilingCategory, duration: Duration) {
        match category {
            ProfilingCategory::EntryWrap => self.entry_time += duration,
            ProfilingCategory::ExitWrap => self.exit_time += duration,
            ProfilingCategory::CallerResolution => self.caller_time += duration,
            ProfilingCategory::Rendering => self.render_time += duration,
        }
    }

    pub fn wall_time(&self) -> Duration {
        self.start_time
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }

    pub fn entries_logged(&self) -> u64 {
        self.entries_logged
    }

    pub fn time_in_category(&self, category: ProfilingCategory) -> Duration {
        match category {
            ProfilingCategory::EntryWrap => self.entry_time,
            ProfilingCategory::ExitWrap => self.exit_time,
            ProfilingCategory::CallerResolution => self.caller_time,
            ProfilingCategory::Rendering => self.render_time,
        }
    }

    /// Total time spent inside the recorder
    pub fn overhead(&self) -> Duration {
        self.entry_time + self.exit_time + self.caller_time + self.render_time
    }

    /// Print profiling summary to stderr
    pub fn print_summary(&self) {
        let wall = self.wall_time();
        let overhead = self.overhead();

        eprintln!("\n╔════════════════════════════════════════════════════════════╗");
        eprintln!("║  hookmon Self-Profiling Results                            ║");
        eprintln!("╚════════════════════════════════════════════════════════════╝");
        eprintln!();
        eprintln!("Entries logged:            {}", self.entries_logged);
        eprintln!("Total wall time:           {:.3}s", wall.as_secs_f64());
        eprintln!(
            "Recorder overhead:         {:.6}s ({:.1}%)",
            overhead.as_secs_f64(),
            percent(overhead, wall)
        );
        eprintln!();
        eprintln!("Overhead breakdown:");
        self.print_category("Entry wrappers", self.entry_time, overhead);
        self.print_category("Exit wrappers", self.exit_time, overhead);
        self.print_category("Caller resolution", self.caller_time, overhead);
        self.print_category("Rendering", self.render_time, overhead);
        eprintln!();
    }

    fn print_category(&self, name: &str, time: Duration, total: Duration) {
        if time > Duration::ZERO {
            eprintln!(
                "  - {:20} {:.6}s ({:.1}%)",
                format!("{}:", name),
                time.as_secs_f64(),
                percent(time, total)
            );
        }
    }
}

fn percent(part: Duration, whole: Duration) -> f64 {
    if whole.is_zero() {
        0.0
    } else {
        part.as_secs_f64() / whole.as_secs_f64() * 100.0
    }
}
