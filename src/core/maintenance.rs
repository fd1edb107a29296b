//! # Fan-cleaning schedule.
//!
//! Tracks when the sensor fan was last cleaned. The timestamp starts at
//! supervisor construction (not at the first connection) and survives
//! reconnects; it is reset whenever a cleaning fires, whether or not the
//! cleaning command succeeded.
//!
//! ```text
//! new(interval, now) ── last = now
//!
//! each steady-state iteration:
//!   poll(now) ── now - last >= interval ? (last = now; true) : false
//! ```

use std::time::Duration;

use tokio::time::Instant;

/// Independent timer for the periodic cleaning cycle.
#[derive(Clone, Debug)]
pub struct MaintenanceSchedule {
    interval: Duration,
    last: Instant,
}

impl MaintenanceSchedule {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last: now,
        }
    }

    /// True once at least `interval` has elapsed since the last cleaning.
    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last) >= self.interval
    }

    /// Checks the schedule and, if due, records `now` as the last cleaning.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.last = now;
            true
        } else {
            false
        }
    }
}
