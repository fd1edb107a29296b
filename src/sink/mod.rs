//! # Telemetry side of the bridge.
//!
//! [`TelemetrySink`] is the capability the [`Supervisor`](crate::Supervisor)
//! consumes; [`ThingsBoardSink`] implements it over MQTT.

mod thingsboard;

use async_trait::async_trait;

use crate::error::SinkError;
use crate::model::{DeviceIdentity, Reading};

pub use thingsboard::{ATTRIBUTES_TOPIC, TELEMETRY_TOPIC, ThingsBoardSink, ThingsBoardSettings};

/// # Connection to the remote telemetry platform.
///
/// Exclusively owned by the supervisor. Publishing before `connect` fails with
/// [`SinkError::NotConnected`].
#[async_trait]
pub trait TelemetrySink: Send + 'static {
    /// Opens the session. Replaces any previous session.
    async fn connect(&mut self) -> Result<(), SinkError>;

    /// Publishes the one-shot attribute set describing the device.
    async fn publish_attributes(&mut self, identity: &DeviceIdentity) -> Result<(), SinkError>;

    /// Publishes one time-series reading.
    async fn publish_telemetry(&mut self, reading: &Reading) -> Result<(), SinkError>;

    /// Closes the session. Idempotent, best-effort.
    async fn disconnect(&mut self) -> Result<(), SinkError>;
}
