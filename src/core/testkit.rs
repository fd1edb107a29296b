//! Scripted in-memory collaborators for supervisor tests.
//!
//! Each fake records what happened into a shared log that the test keeps a
//! handle to, since the supervisor takes ownership of the fake itself.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::SupervisorConfig;
use crate::device::SensorPort;
use crate::error::{DeviceError, SinkError};
use crate::events::{Event, EventKind};
use crate::model::{DeviceIdentity, Poll, Reading};
use crate::sink::TelemetrySink;

pub(crate) fn test_config() -> SupervisorConfig {
    SupervisorConfig::default()
}

pub(crate) fn reading(pm1_0: f64) -> Reading {
    Reading {
        pm1_0,
        pm2_5: 2.0,
        pm4_0: 3.0,
        pm10_0: 4.0,
        humidity: 45.5,
        temperature: 21.25,
        voc_index: Some(100.0),
        nox_index: None,
    }
}

pub(crate) fn identity() -> DeviceIdentity {
    DeviceIdentity {
        version: "firmware 2.0, hardware 4.5, protocol 1.0".to_string(),
        product_name: "SEN55".to_string(),
        serial_number: "FAKE0001".to_string(),
    }
}

/// Collects the delays of the next `n` `BackoffScheduled` events.
pub(crate) async fn backoff_delays(
    rx: &mut broadcast::Receiver<Event>,
    n: usize,
) -> Vec<Duration> {
    let mut delays = Vec::with_capacity(n);
    while delays.len() < n {
        let ev = rx.recv().await.expect("bus closed");
        if ev.kind == EventKind::BackoffScheduled {
            delays.push(ev.delay().expect("backoff event without delay"));
        }
    }
    delays
}

/// What the fake sensor does, in order.
#[derive(Default)]
pub(crate) struct Script {
    connect_failures: u32,
    start_failures: u32,
    cleaning_fails: bool,
    identity_fails: bool,
    stop_fails: bool,
    polls: VecDeque<Result<Poll, DeviceError>>,
}

impl Script {
    /// The first `n` connects fail.
    pub fn fail_connects(mut self, n: u32) -> Self {
        self.connect_failures = n;
        self
    }

    /// The first `n` start-measurement calls fail.
    pub fn fail_start_measurement(mut self, n: u32) -> Self {
        self.start_failures = n;
        self
    }

    /// Every cleaning command fails.
    pub fn fail_cleaning(mut self) -> Self {
        self.cleaning_fails = true;
        self
    }

    /// Every identity request fails.
    pub fn fail_identity(mut self) -> Self {
        self.identity_fails = true;
        self
    }

    /// Every stop-measurement command fails on a connected sensor.
    pub fn fail_stop(mut self) -> Self {
        self.stop_fails = true;
        self
    }

    /// Poll results across all sessions; `NotReady` once exhausted.
    pub fn then_polls(mut self, polls: Vec<Result<Poll, DeviceError>>) -> Self {
        self.polls = polls.into();
        self
    }
}

#[derive(Debug, Default)]
pub(crate) struct SensorLog {
    pub connects: u32,
    pub measurements_started: u32,
    pub polls: u32,
    pub cleanings: u32,
    pub stops: u32,
    pub connected: bool,
}

pub(crate) struct FakeSensor {
    script: Script,
    log: Arc<Mutex<SensorLog>>,
}

impl FakeSensor {
    pub fn new(script: Script) -> (Self, Arc<Mutex<SensorLog>>) {
        let log = Arc::new(Mutex::new(SensorLog::default()));
        (
            Self {
                script,
                log: log.clone(),
            },
            log,
        )
    }

    fn require_connected(&self) -> Result<(), DeviceError> {
        if self.log.lock().unwrap().connected {
            Ok(())
        } else {
            Err(DeviceError::NotConnected)
        }
    }
}

#[async_trait]
impl SensorPort for FakeSensor {
    async fn connect(&mut self) -> Result<(), DeviceError> {
        let mut log = self.log.lock().unwrap();
        log.connects += 1;
        if self.script.connect_failures > 0 {
            self.script.connect_failures -= 1;
            return Err(DeviceError::Open {
                path: "/dev/i2c-fake".to_string(),
                error: "no such device".to_string(),
            });
        }
        log.connected = true;
        Ok(())
    }

    async fn device_identity(&mut self) -> Result<DeviceIdentity, DeviceError> {
        self.require_connected()?;
        if self.script.identity_fails {
            return Err(DeviceError::Crc {
                expected: 0x92,
                actual: 0x00,
            });
        }
        Ok(identity())
    }

    async fn start_measurement(&mut self) -> Result<(), DeviceError> {
        self.require_connected()?;
        if self.script.start_failures > 0 {
            self.script.start_failures -= 1;
            return Err(DeviceError::Bus {
                error: "nack".to_string(),
            });
        }
        self.log.lock().unwrap().measurements_started += 1;
        Ok(())
    }

    async fn poll_reading(&mut self) -> Result<Poll, DeviceError> {
        self.require_connected()?;
        self.log.lock().unwrap().polls += 1;
        self.script.polls.pop_front().unwrap_or(Ok(Poll::NotReady))
    }

    async fn start_cleaning(&mut self) -> Result<(), DeviceError> {
        self.require_connected()?;
        self.log.lock().unwrap().cleanings += 1;
        if self.script.cleaning_fails {
            return Err(DeviceError::Bus {
                error: "nack".to_string(),
            });
        }
        Ok(())
    }

    async fn stop_measurement(&mut self) -> Result<(), DeviceError> {
        self.require_connected()?;
        self.log.lock().unwrap().stops += 1;
        if self.script.stop_fails {
            return Err(DeviceError::Bus {
                error: "nack".to_string(),
            });
        }
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.log.lock().unwrap().connected = false;
    }
}

#[derive(Debug, Default)]
pub(crate) struct SinkLog {
    pub connects: u32,
    pub disconnects: u32,
    pub attributes: Vec<DeviceIdentity>,
    pub telemetry: Vec<Reading>,
    pub connected: bool,
}

pub(crate) struct FakeSink {
    connect_failures: u32,
    attribute_failures: u32,
    telemetry_failures: u32,
    disconnect_fails: bool,
    log: Arc<Mutex<SinkLog>>,
}

impl FakeSink {
    pub fn new() -> (Self, Arc<Mutex<SinkLog>>) {
        Self::failing_connects(0)
    }

    /// The first `n` connects fail.
    pub fn failing_connects(n: u32) -> (Self, Arc<Mutex<SinkLog>>) {
        let log = Arc::new(Mutex::new(SinkLog::default()));
        (
            Self {
                connect_failures: n,
                attribute_failures: 0,
                telemetry_failures: 0,
                disconnect_fails: false,
                log: log.clone(),
            },
            log,
        )
    }

    /// The first `n` attribute publishes fail.
    pub fn fail_attributes(mut self, n: u32) -> Self {
        self.attribute_failures = n;
        self
    }

    /// The first `n` telemetry publishes fail.
    pub fn fail_telemetry(mut self, n: u32) -> Self {
        self.telemetry_failures = n;
        self
    }

    /// Every disconnect of an open session fails after closing it.
    pub fn fail_disconnect(mut self) -> Self {
        self.disconnect_fails = true;
        self
    }
}

fn broker_gone() -> SinkError {
    SinkError::Publish {
        error: "broker gone".to_string(),
    }
}

#[async_trait]
impl TelemetrySink for FakeSink {
    async fn connect(&mut self) -> Result<(), SinkError> {
        let mut log = self.log.lock().unwrap();
        log.connects += 1;
        if self.connect_failures > 0 {
            self.connect_failures -= 1;
            return Err(SinkError::Connect {
                error: "connection refused".to_string(),
            });
        }
        log.connected = true;
        Ok(())
    }

    async fn publish_attributes(&mut self, identity: &DeviceIdentity) -> Result<(), SinkError> {
        let mut log = self.log.lock().unwrap();
        if !log.connected {
            return Err(SinkError::NotConnected);
        }
        if self.attribute_failures > 0 {
            self.attribute_failures -= 1;
            return Err(broker_gone());
        }
        log.attributes.push(identity.clone());
        Ok(())
    }

    async fn publish_telemetry(&mut self, reading: &Reading) -> Result<(), SinkError> {
        let mut log = self.log.lock().unwrap();
        if !log.connected {
            return Err(SinkError::NotConnected);
        }
        if self.telemetry_failures > 0 {
            self.telemetry_failures -= 1;
            return Err(broker_gone());
        }
        log.telemetry.push(reading.clone());
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), SinkError> {
        let mut log = self.log.lock().unwrap();
        if !log.connected {
            return Ok(());
        }
        log.connected = false;
        log.disconnects += 1;
        if self.disconnect_fails {
            return Err(SinkError::Disconnect {
                error: "request queue closed".to_string(),
            });
        }
        Ok(())
    }
}
