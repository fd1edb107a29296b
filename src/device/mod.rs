//! # Sensor side of the bridge.
//!
//! [`SensorPort`] is the capability the [`Supervisor`](crate::Supervisor)
//! consumes. [`Sen5xPort`] implements it for a Sensirion SEN5x on any
//! `embedded-hal` 1.0 I²C bus; [`open_linux`] wires it to a Linux
//! `/dev/i2c-*` device.
//!
//! ```text
//! Supervisor ──► SensorPort ──► Sen5xPort ──► Sen5x<I: I2c> ──► /dev/i2c-N
//!                                   │
//!                                   └─ opener: FnMut() -> I   (re-run on every connect)
//! ```

mod crc;
mod port;
mod sen5x;

use async_trait::async_trait;

use crate::error::DeviceError;
use crate::model::{DeviceIdentity, Poll};

pub use port::{Sen5xPort, open_linux};
pub use sen5x::{ADDRESS, Sen5x, Version};

/// # Connection to the physical sensor.
///
/// Exclusively owned by the supervisor. Operations on a port that is not
/// connected fail with [`DeviceError::NotConnected`].
#[async_trait]
pub trait SensorPort: Send + 'static {
    /// Opens the bus. Replaces any previous connection.
    async fn connect(&mut self) -> Result<(), DeviceError>;

    /// Reads version, product name and serial number.
    async fn device_identity(&mut self) -> Result<DeviceIdentity, DeviceError>;

    /// Starts continuous sampling.
    async fn start_measurement(&mut self) -> Result<(), DeviceError>;

    /// Returns a fresh reading if one is ready. Never waits for data.
    async fn poll_reading(&mut self) -> Result<Poll, DeviceError>;

    /// Starts a fan-cleaning cycle. Best-effort.
    async fn start_cleaning(&mut self) -> Result<(), DeviceError>;

    /// Stops continuous sampling. Best-effort.
    async fn stop_measurement(&mut self) -> Result<(), DeviceError>;

    /// Releases the bus handle. Idempotent.
    async fn disconnect(&mut self);
}
