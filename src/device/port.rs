//! # `SensorPort` backed by a SEN5x driver.

use async_trait::async_trait;
use embedded_hal::i2c::I2c;
use linux_embedded_hal::I2cdev;
use tracing::{debug, info};

use super::SensorPort;
use super::sen5x::Sen5x;
use crate::error::DeviceError;
use crate::model::{DeviceIdentity, Poll};

/// Sensor port that (re)opens its bus through `opener` on every connect.
pub struct Sen5xPort<I, F> {
    bus_name: String,
    opener: F,
    device: Option<Sen5x<I>>,
}

impl<I, F> Sen5xPort<I, F>
where
    I: I2c,
    F: FnMut() -> Result<I, DeviceError>,
{
    /// Creates a disconnected port. `bus_name` is used in logs only.
    pub fn new(bus_name: impl Into<String>, opener: F) -> Self {
        Self {
            bus_name: bus_name.into(),
            opener,
            device: None,
        }
    }

    /// True while a bus handle is held.
    pub fn is_connected(&self) -> bool {
        self.device.is_some()
    }

    fn device(&mut self) -> Result<&mut Sen5x<I>, DeviceError> {
        self.device.as_mut().ok_or(DeviceError::NotConnected)
    }
}

/// Port for a SEN5x on a Linux I²C character device such as `/dev/i2c-1`.
pub fn open_linux(
    path: String,
) -> Sen5xPort<I2cdev, impl FnMut() -> Result<I2cdev, DeviceError> + Send + 'static> {
    let opener_path = path.clone();
    Sen5xPort::new(path, move || {
        I2cdev::new(&opener_path).map_err(|e| DeviceError::Open {
            path: opener_path.clone(),
            error: e.to_string(),
        })
    })
}

#[async_trait]
impl<I, F> SensorPort for Sen5xPort<I, F>
where
    I: I2c + Send + 'static,
    F: FnMut() -> Result<I, DeviceError> + Send + 'static,
{
    async fn connect(&mut self) -> Result<(), DeviceError> {
        self.device = None;
        let bus = (self.opener)()?;
        self.device = Some(Sen5x::new(bus));
        info!(bus = %self.bus_name, "connected to SEN5x device");
        Ok(())
    }

    async fn device_identity(&mut self) -> Result<DeviceIdentity, DeviceError> {
        let identity = self.device()?.identity().await?;
        info!(%identity, "retrieved device info");
        Ok(identity)
    }

    async fn start_measurement(&mut self) -> Result<(), DeviceError> {
        self.device()?.start_measurement().await?;
        info!("measurement started");
        Ok(())
    }

    async fn poll_reading(&mut self) -> Result<Poll, DeviceError> {
        let device = self.device()?;
        if !device.data_ready().await? {
            debug!("no new data available");
            return Ok(Poll::NotReady);
        }
        let reading = device.measured_values().await?;
        debug!(%reading, "read data");
        Ok(Poll::Ready(reading))
    }

    async fn start_cleaning(&mut self) -> Result<(), DeviceError> {
        self.device()?.start_fan_cleaning().await?;
        info!("fan cleaning started");
        Ok(())
    }

    async fn stop_measurement(&mut self) -> Result<(), DeviceError> {
        self.device()?.stop_measurement().await?;
        info!("measurement stopped");
        Ok(())
    }

    async fn disconnect(&mut self) {
        if self.device.take().is_some() {
            debug!(bus = %self.bus_name, "released bus");
        }
    }
}
