//! # One connected episode: announce, then poll/maintain/publish until stop or failure.
//!
//! A [`Session`] borrows both collaborators from the supervisor for the
//! duration of one successful bring-up. It never opens or closes connections;
//! teardown stays with the supervisor.
//!
//! ## Flow
//! ```text
//! announce():  sensor.device_identity() ─► sink.publish_attributes()  ─► DeviceAnnounced
//!
//! run(token):
//! loop {
//!   ├─► token cancelled?                        → Ok(())   (stop request)
//!   ├─► maintain(): schedule due? → sensor.start_cleaning()
//!   │                 ├─ Ok  → CleaningStarted
//!   │                 └─ Err → CleaningFailed  (loop continues)
//!   ├─► sensor.poll_reading()
//!   │     ├─ Ready(r)  → sink.publish_telemetry(r) → TelemetryPublished
//!   │     ├─ NotReady  → ReadingNotReady            (nothing published)
//!   │     └─ Err       → return Err(Session)
//!   └─► select! { sleep(publish_interval), token.cancelled() → Ok(()) }
//! }
//! ```
//!
//! ## Rules
//! - A poll or publish error ends the episode immediately (no retry in place).
//! - The stop token is checked at iteration boundaries and during the pacing
//!   sleep, never in the middle of a collaborator call.
//! - Cleaning failures are reported, never propagated.

use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use super::maintenance::MaintenanceSchedule;
use crate::device::SensorPort;
use crate::error::CycleError;
use crate::events::{Bus, Event, EventKind};
use crate::model::Poll;
use crate::sink::TelemetrySink;

/// Steady-state loop over borrowed collaborators.
pub(crate) struct Session<'a, S, T> {
    pub sensor: &'a mut S,
    pub sink: &'a mut T,
    pub bus: &'a Bus,
    pub maintenance: &'a mut MaintenanceSchedule,
    pub publish_interval: Duration,
}

impl<S: SensorPort, T: TelemetrySink> Session<'_, S, T> {
    /// Publishes the device identity as client attributes.
    ///
    /// Runs once per bring-up; any failure is a steady-state failure.
    pub async fn announce(&mut self) -> Result<(), CycleError> {
        let identity = self
            .sensor
            .device_identity()
            .await
            .map_err(CycleError::session)?;
        self.sink
            .publish_attributes(&identity)
            .await
            .map_err(CycleError::session)?;

        self.bus
            .publish(Event::new(EventKind::DeviceAnnounced).with_reason(identity.to_string()));
        Ok(())
    }

    /// Runs the steady-state loop.
    ///
    /// Returns `Ok(())` when `token` is cancelled, or the first poll/publish error.
    pub async fn run(&mut self, token: &CancellationToken) -> Result<(), CycleError> {
        loop {
            if token.is_cancelled() {
                return Ok(());
            }

            self.iterate().await?;

            select! {
                _ = time::sleep(self.publish_interval) => {}
                _ = token.cancelled() => return Ok(()),
            }
        }
    }

    async fn iterate(&mut self) -> Result<(), CycleError> {
        self.maintain().await;

        match self.sensor.poll_reading().await.map_err(CycleError::session)? {
            Poll::Ready(reading) => {
                self.sink
                    .publish_telemetry(&reading)
                    .await
                    .map_err(CycleError::session)?;
                self.bus.publish(
                    Event::new(EventKind::TelemetryPublished).with_reason(reading.to_string()),
                );
            }
            Poll::NotReady => {
                self.bus.publish(Event::new(EventKind::ReadingNotReady));
            }
        }
        Ok(())
    }

    async fn maintain(&mut self) {
        if !self.maintenance.poll(time::Instant::now()) {
            return;
        }

        match self.sensor.start_cleaning().await {
            Ok(()) => self.bus.publish(Event::new(EventKind::CleaningStarted)),
            Err(e) => self.bus.publish(
                Event::new(EventKind::CleaningFailed)
                    .with_label(e.as_label())
                    .with_reason(e.to_string()),
            ),
        }
    }
}
