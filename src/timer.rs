//! Monotonic timestamps for hook entry/exit capture
//!
//! The recorder never reads the clock directly: every session owns a
//! [`Clock`] so tests can drive time by hand with [`ManualClock`].

use std::cell::Cell;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A monotonic reading, measured from the owning clock's origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// Build a timestamp from an offset since the clock origin
    pub fn from_offset(offset: Duration) -> Self {
        Self(offset)
    }

    /// Offset since the clock origin
    pub fn offset(&self) -> Duration {
        self.0
    }

    /// Seconds elapsed from `earlier` to `self`, clamped at zero
    pub fn seconds_since(&self, earlier: Timestamp) -> f64 {
        self.0.saturating_sub(earlier.0).as_secs_f64()
    }
}

/// Source of time for a monitor session
pub trait Clock {
    /// Monotonic reading with sub-millisecond resolution
    fn now(&self) -> Timestamp;

    /// Seconds since the Unix epoch
    fn wall_clock(&self) -> f64;
}

/// Real clock: `Instant` for durations, `SystemTime` for completion stamps
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.origin.elapsed())
    }

    fn wall_clock(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default()
    }
}

/// Clock that only moves when told to
///
/// # Example
/// ```
/// use hookmon::timer::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_millis(200));
/// assert_eq!(clock.now().seconds_since(start), 0.2);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    elapsed: Cell<Duration>,
    epoch_base: f64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manual clock whose wall clock starts at `epoch_base` seconds
    pub fn starting_at(epoch_base: f64) -> Self {
        Self {
            elapsed: Cell::new(Duration::ZERO),
            epoch_base,
        }
    }

    /// Move forward by `by`, saturating at [`Duration::MAX`]
    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get().saturating_add(by));
    }

    /// Negative or NaN amounts are ignored; oversized ones saturate
    pub fn advance_secs(&self, secs: f64) {
        match Duration::try_from_secs_f64(secs) {
            Ok(by) => self.advance(by),
            Err(_) if secs > 0.0 => self.advance(Duration::MAX),
            Err(_) => {}
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.elapsed.get())
    }

    fn wall_clock(&self) -> f64 {
        self.epoch_base + self.elapsed.get().as_secs_f64()
    }
}
