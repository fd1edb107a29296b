//! # SEN5x I²C driver.
//!
//! Every command is a 16-bit big-endian word. Responses are a sequence of
//! 2-byte data words, each followed by its CRC-8. After sending a command the
//! host must wait the command's execution time before reading.

use std::fmt;
use std::time::Duration;

use embedded_hal::i2c::I2c;
use tokio::time;

use super::crc::crc8;
use crate::error::DeviceError;
use crate::model::{DeviceIdentity, Reading};

/// Fixed 7-bit bus address of every SEN5x variant.
pub const ADDRESS: u8 = 0x69;

/// Marker for "no valid value" in signed channels.
const INVALID_I16: i16 = i16::MAX;

#[derive(Clone, Copy, Debug)]
struct Command {
    code: u16,
    exec: Duration,
}

const fn cmd(code: u16, exec_ms: u64) -> Command {
    Command {
        code,
        exec: Duration::from_millis(exec_ms),
    }
}

const START_MEASUREMENT: Command = cmd(0x0021, 50);
const STOP_MEASUREMENT: Command = cmd(0x0104, 200);
const READ_DATA_READY: Command = cmd(0x0202, 20);
const READ_MEASURED_VALUES: Command = cmd(0x03C4, 20);
const START_FAN_CLEANING: Command = cmd(0x5607, 20);
const READ_PRODUCT_NAME: Command = cmd(0xD014, 20);
const READ_SERIAL_NUMBER: Command = cmd(0xD033, 20);
const READ_VERSION: Command = cmd(0xD100, 20);

/// Firmware, hardware and protocol versions reported by the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Version {
    pub firmware: (u8, u8),
    pub firmware_debug: bool,
    pub hardware: (u8, u8),
    pub protocol: (u8, u8),
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "firmware {}.{}{}, hardware {}.{}, protocol {}.{}",
            self.firmware.0,
            self.firmware.1,
            if self.firmware_debug { "-debug" } else { "" },
            self.hardware.0,
            self.hardware.1,
            self.protocol.0,
            self.protocol.1
        )
    }
}

/// SEN5x on an owned I²C bus.
pub struct Sen5x<I> {
    i2c: I,
}

impl<I: I2c> Sen5x<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Gives the bus back.
    pub fn release(self) -> I {
        self.i2c
    }

    pub async fn start_measurement(&mut self) -> Result<(), DeviceError> {
        self.send(START_MEASUREMENT).await
    }

    pub async fn stop_measurement(&mut self) -> Result<(), DeviceError> {
        self.send(STOP_MEASUREMENT).await
    }

    pub async fn start_fan_cleaning(&mut self) -> Result<(), DeviceError> {
        self.send(START_FAN_CLEANING).await
    }

    pub async fn data_ready(&mut self) -> Result<bool, DeviceError> {
        let bytes = self.read(READ_DATA_READY, 1).await?;
        Ok(bytes[1] != 0)
    }

    pub async fn measured_values(&mut self) -> Result<Reading, DeviceError> {
        let bytes = self.read(READ_MEASURED_VALUES, 8).await?;
        let words: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|w| u16::from_be_bytes([w[0], w[1]]))
            .collect();
        Ok(decode_measured_values(&words))
    }

    pub async fn product_name(&mut self) -> Result<String, DeviceError> {
        let bytes = self.read(READ_PRODUCT_NAME, 16).await?;
        Ok(ascii(&bytes))
    }

    pub async fn serial_number(&mut self) -> Result<String, DeviceError> {
        let bytes = self.read(READ_SERIAL_NUMBER, 16).await?;
        Ok(ascii(&bytes))
    }

    pub async fn version(&mut self) -> Result<Version, DeviceError> {
        let b = self.read(READ_VERSION, 4).await?;
        Ok(Version {
            firmware: (b[0], b[1]),
            firmware_debug: b[2] != 0,
            hardware: (b[3], b[4]),
            protocol: (b[5], b[6]),
        })
    }

    pub async fn identity(&mut self) -> Result<DeviceIdentity, DeviceError> {
        Ok(DeviceIdentity {
            version: self.version().await?.to_string(),
            product_name: self.product_name().await?,
            serial_number: self.serial_number().await?,
        })
    }

    async fn send(&mut self, command: Command) -> Result<(), DeviceError> {
        self.i2c
            .write(ADDRESS, &command.code.to_be_bytes())
            .map_err(bus_error)?;
        time::sleep(command.exec).await;
        Ok(())
    }

    /// Sends `command` and reads `words` CRC-checked data words.
    ///
    /// Returns the data bytes with checksums stripped.
    async fn read(&mut self, command: Command, words: usize) -> Result<Vec<u8>, DeviceError> {
        self.send(command).await?;

        let mut raw = vec![0u8; words * 3];
        self.i2c.read(ADDRESS, &mut raw).map_err(bus_error)?;

        let mut data = Vec::with_capacity(words * 2);
        for chunk in raw.chunks_exact(3) {
            let expected = crc8(&chunk[..2]);
            if chunk[2] != expected {
                return Err(DeviceError::Crc {
                    expected,
                    actual: chunk[2],
                });
            }
            data.extend_from_slice(&chunk[..2]);
        }
        Ok(data)
    }
}

fn bus_error<E: fmt::Debug>(err: E) -> DeviceError {
    DeviceError::Bus {
        error: format!("{err:?}"),
    }
}

fn ascii(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}

fn decode_measured_values(words: &[u16]) -> Reading {
    let signed = |i: usize| words[i] as i16;
    let index = |i: usize| match signed(i) {
        INVALID_I16 => None,
        raw => Some(f64::from(raw) / 10.0),
    };

    Reading {
        pm1_0: f64::from(words[0]) / 10.0,
        pm2_5: f64::from(words[1]) / 10.0,
        pm4_0: f64::from(words[2]) / 10.0,
        pm10_0: f64::from(words[3]) / 10.0,
        humidity: f64::from(signed(4)) / 100.0,
        temperature: f64::from(signed(5)) / 200.0,
        voc_index: index(6),
        nox_index: index(7),
    }
}
