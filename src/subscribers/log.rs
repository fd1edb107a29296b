//! # LogWriter: events to tracing lines
//!
//! Subscriber that renders every [`Event`] as one structured `tracing` record.
//! The binary always installs it, so the log stream shows connect attempts,
//! backoff delays, readings and cleaning cycles.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO  bring-up starting attempt=1
//! WARN  cycle failed attempt=1 label="bring_up_failed" reason="bring-up failed: sensor: ..."
//! WARN  retrying after backoff attempt=1 delay_ms=5000
//! INFO  connected attempt=2
//! INFO  device announced identity="product=SEN55 serial=1234ABCD version=2.0"
//! INFO  telemetry published reading="pm1.0=1.0 pm2.5=2.0 ..."
//! INFO  shutdown requested
//! INFO  supervisor stopped
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const NONE: &str = "-";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let reason = e.reason.as_deref().unwrap_or(NONE);
        let label = e.label.unwrap_or(NONE);
        let attempt = e.attempt.unwrap_or_default();

        match e.kind {
            EventKind::BringUpStarting => info!(attempt, "bring-up starting"),
            EventKind::Connected => info!(attempt, "connected"),
            EventKind::CycleFailed => warn!(attempt, label, reason, "cycle failed"),
            EventKind::BackoffScheduled => warn!(
                attempt,
                delay_ms = e.delay_ms.unwrap_or_default(),
                "retrying after backoff"
            ),
            EventKind::DeviceAnnounced => info!(identity = reason, "device announced"),
            EventKind::TelemetryPublished => info!(reading = reason, "telemetry published"),
            EventKind::ReadingNotReady => debug!("no new data available"),
            EventKind::CleaningStarted => info!("fan cleaning started"),
            EventKind::CleaningFailed => warn!(reason, "fan cleaning failed"),
            EventKind::TeardownFailed => warn!(step = label, reason, "teardown step failed"),
            EventKind::TeardownCompleted => debug!("teardown completed"),
            EventKind::ShutdownRequested => info!("shutdown requested"),
            EventKind::Stopped => info!("supervisor stopped"),
            EventKind::SubscriberOverflow => {
                warn!(subscriber = label, reason, "subscriber dropped event")
            }
            EventKind::SubscriberPanicked => {
                error!(subscriber = label, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
