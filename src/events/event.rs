//! # Runtime events emitted by the supervisor.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Bring-up events**: connection attempts, failures and backoff
//! - **Steady-state events**: readings, empty polls, cleaning
//! - **Teardown events**: best-effort release problems
//! - **Shutdown / subscriber events**: stop requests and fan-out health
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! attempt numbers, reasons, and backoff delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use sen5x_bridge::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_attempt(3)
//!     .with_delay(Duration::from_secs(20))
//!     .with_reason("bring-up failed: no ack");
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.delay_ms, Some(20_000));
//! assert_eq!(ev.reason.as_deref(), Some("bring-up failed: no ack"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Bring-up ===
    /// A bring-up attempt is starting.
    ///
    /// Sets: `attempt`
    BringUpStarting,

    /// Both collaborators connected and measurement started.
    ///
    /// Sets: `attempt`
    Connected,

    /// The cycle ended with an error (bring-up or steady state).
    ///
    /// Sets: `attempt`, `reason` (error message), `label` (error label)
    CycleFailed,

    /// Next bring-up attempt scheduled after a failure.
    ///
    /// Sets: `attempt` (the failed one), `delay_ms`, `reason`
    BackoffScheduled,

    // === Steady state ===
    /// Device identity published as attributes.
    ///
    /// Sets: `reason` (identity summary)
    DeviceAnnounced,

    /// A reading was forwarded as telemetry.
    ///
    /// Sets: `reason` (reading summary)
    TelemetryPublished,

    /// The sensor had no new data this iteration.
    ReadingNotReady,

    /// Scheduled fan cleaning was issued.
    CleaningStarted,

    /// Scheduled fan cleaning failed (the loop continues).
    ///
    /// Sets: `reason`
    CleaningFailed,

    // === Teardown ===
    /// A best-effort teardown step failed.
    ///
    /// Sets: `label` (step), `reason`
    TeardownFailed,

    /// Both collaborators were released.
    TeardownCompleted,

    // === Shutdown ===
    /// Stop requested (OS signal observed).
    ShutdownRequested,

    /// The supervisor left its run loop.
    Stopped,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `label` (subscriber name), `reason` (panic message)
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `label` (subscriber name), `reason`
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Bring-up attempt number (starting from 1).
    pub attempt: Option<u32>,
    /// Backoff delay in milliseconds.
    pub delay_ms: Option<u64>,
    /// Short stable label (error label, teardown step, subscriber name).
    pub label: Option<&'static str>,
    /// Human-readable detail (errors, summaries).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            attempt: None,
            delay_ms: None,
            label: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a stable label.
    #[inline]
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Backoff delay, if set.
    #[inline]
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(Duration::from_millis)
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_label(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_label(subscriber)
            .with_reason(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::Connected);
        let b = Event::new(EventKind::Connected);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_round_trips_through_millis() {
        let ev = Event::new(EventKind::BackoffScheduled).with_delay(Duration::from_secs(300));
        assert_eq!(ev.delay(), Some(Duration::from_secs(300)));
    }
}
