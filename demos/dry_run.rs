//! # Demo: dry_run
//!
//! Runs the supervisor against a simulated sensor and a stdout sink, with
//! short intervals, so the retry and publish flow can be watched without
//! hardware or a ThingsBoard server.
//!
//! The simulated sensor refuses the first two connects, reports "no data"
//! on every third poll, and fails once mid-session to show a reconnect.
//!
//! ## Flow
//! ```text
//! attempt 1 ─► sensor connect fails ─► backoff 200ms
//! attempt 2 ─► sensor connect fails ─► backoff 400ms
//! attempt 3 ─► connected ─► attributes ─► telemetry, telemetry, (no data), ...
//!            ─► poll fails ─► teardown ─► backoff 800ms ─► attempt 4 ...
//! stop after 8s (or Ctrl-C)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example dry_run
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sen5x_bridge::{
    BackoffPolicy, DeviceError, DeviceIdentity, JitterPolicy, LogWriter, Poll, Reading,
    SensorPort, SinkError, Supervisor, SupervisorConfig, TelemetrySink,
};
use tokio_util::sync::CancellationToken;

/// Sensor that produces a slowly drifting reading.
#[derive(Default)]
struct SimulatedSensor {
    connects: u32,
    polls: u32,
    connected: bool,
}

#[async_trait]
impl SensorPort for SimulatedSensor {
    async fn connect(&mut self) -> Result<(), DeviceError> {
        self.connects += 1;
        if self.connects <= 2 {
            return Err(DeviceError::Open {
                path: "/dev/i2c-sim".into(),
                error: "no such device".into(),
            });
        }
        self.connected = true;
        Ok(())
    }

    async fn device_identity(&mut self) -> Result<DeviceIdentity, DeviceError> {
        Ok(DeviceIdentity {
            version: "firmware 2.0, hardware 4.5, protocol 1.0".into(),
            product_name: "SEN55".into(),
            serial_number: "SIM-0001".into(),
        })
    }

    async fn start_measurement(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    async fn poll_reading(&mut self) -> Result<Poll, DeviceError> {
        if !self.connected {
            return Err(DeviceError::NotConnected);
        }
        self.polls += 1;
        if self.polls == 7 {
            return Err(DeviceError::Bus {
                error: "simulated nack".into(),
            });
        }
        if self.polls % 3 == 0 {
            return Ok(Poll::NotReady);
        }

        let t = f64::from(self.polls);
        Ok(Poll::Ready(Reading {
            pm1_0: 3.0 + t * 0.1,
            pm2_5: 5.0 + t * 0.1,
            pm4_0: 6.0 + t * 0.1,
            pm10_0: 7.0 + t * 0.1,
            humidity: 42.0,
            temperature: 21.5,
            voc_index: Some(100.0),
            nox_index: None,
        }))
    }

    async fn start_cleaning(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    async fn stop_measurement(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }
}

/// Sink that prints payloads instead of sending them.
struct StdoutSink;

#[async_trait]
impl TelemetrySink for StdoutSink {
    async fn connect(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    async fn publish_attributes(&mut self, identity: &DeviceIdentity) -> Result<(), SinkError> {
        println!("attributes {}", serde_json::to_string(identity)?);
        Ok(())
    }

    async fn publish_telemetry(&mut self, reading: &Reading) -> Result<(), SinkError> {
        println!("telemetry  {}", serde_json::to_string(reading)?);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();

    let cfg = SupervisorConfig {
        publish_interval: Duration::from_millis(500),
        backoff: BackoffPolicy {
            first: Duration::from_millis(200),
            max: Duration::from_secs(2),
            factor: 2.0,
            jitter: JitterPolicy::None,
        },
        cleaning_interval: Duration::from_secs(3),
        bus_capacity: 128,
    };

    let sup = Supervisor::builder(cfg, SimulatedSensor::default(), StdoutSink)
        .with_subscriber(Arc::new(LogWriter::new()))
        .build();

    let token = CancellationToken::new();
    let stopper = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(8)) => {}
            _ = tokio::signal::ctrl_c() => {}
        }
        stopper.cancel();
    });

    sup.run(token).await;
}
