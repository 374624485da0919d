//! # Tick Clock
//!
//! Fixed-rate pacing for the tick thread.
//!
//! ## Design
//!
//! Each tick:
//! - measures `dt` from the previous tick start
//! - sets its deadline one tick duration after its own start
//! - sleeps only for whatever is left of that deadline once the work is done
//!
//! An overrunning tick is never cut short and never skipped. The next tick
//! fires immediately and `dt` grows to cover the lost time.
//!
//! The clock takes `Instant`s from its caller so tests can drive it without
//! sleeping.

use std::time::{Duration, Instant};

/// Timing for one tick, produced by [`TickClock::begin_tick`].
#[derive(Clone, Copy, Debug)]
pub struct TickTiming {
    /// When the tick started.
    pub started: Instant,
    /// Seconds since the previous tick started.
    pub dt: f32,
    /// When the next tick should start.
    pub deadline: Instant,
}

impl TickTiming {
    /// Time left before the deadline, zero once it has passed.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }
}

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickStats {
    /// Minimum tick work time observed.
    pub min_tick_us: u64,
    /// Maximum tick work time observed.
    pub max_tick_us: u64,
    /// Average tick work time (rolling).
    pub avg_tick_us: u64,
    /// Number of late ticks (work finished after the deadline).
    pub late_ticks: u64,
    /// Total ticks measured.
    pub total_ticks: u64,
}

impl TickStats {
    fn empty(tick_duration: Duration) -> Self {
        Self {
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            avg_tick_us: duration_us(tick_duration),
            late_ticks: 0,
            total_ticks: 0,
        }
    }
}

impl Default for TickStats {
    fn default() -> Self {
        Self::empty(Duration::ZERO)
    }
}

/// Fixed-rate tick clock.
#[derive(Clone, Debug)]
pub struct TickClock {
    /// Target interval between tick starts.
    tick_duration: Duration,
    /// Start of the previous tick, or the phase reference before the first.
    last_tick: Instant,
    /// Ticks begun since construction.
    tick_count: u64,
    stats: TickStats,
}

impl TickClock {
    /// Creates a clock ticking every `tick_duration`.
    #[must_use]
    pub fn new(tick_duration: Duration) -> Self {
        Self {
            tick_duration,
            last_tick: Instant::now(),
            tick_count: 0,
            stats: TickStats::empty(tick_duration),
        }
    }

    /// Sets the phase reference. The first `dt` is measured from `now`.
    pub fn start(&mut self, now: Instant) {
        self.last_tick = now;
    }

    /// Begins a tick at `now`.
    pub fn begin_tick(&mut self, now: Instant) -> TickTiming {
        let dt = now.saturating_duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        self.tick_count += 1;

        TickTiming {
            started: now,
            dt,
            deadline: now + self.tick_duration,
        }
    }

    /// Ends a tick whose work finished at `finished`.
    ///
    /// Returns true if the work overran the tick's deadline.
    pub fn end_tick(&mut self, timing: &TickTiming, finished: Instant) -> bool {
        let duration_us = duration_us(finished.saturating_duration_since(timing.started));

        self.stats.total_ticks += 1;
        self.stats.min_tick_us = self.stats.min_tick_us.min(duration_us);
        self.stats.max_tick_us = self.stats.max_tick_us.max(duration_us);

        // Rolling average
        self.stats.avg_tick_us = (self.stats.avg_tick_us * 15 + duration_us) / 16;

        let late = finished > timing.deadline;
        if late {
            self.stats.late_ticks += 1;
        }
        late
    }

    /// Returns the number of ticks begun.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Returns tick statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Returns the target tick duration.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}

fn duration_us(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}
