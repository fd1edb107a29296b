//! # ThingsBoard device API over MQTT.
//!
//! ## Session
//! ```text
//! connect()
//!   ├─► AsyncClient::new(opts{ username = access token })
//!   ├─► poll EventLoop until CONNACK       (bounded by connect_timeout)
//!   │     ├─ Success  → spawn driver(EventLoop)
//!   │     └─ refused  → SinkError::Rejected
//!   └─► driver task polls the EventLoop until DISCONNECT or the first error
//!
//! publish_*() ──► client.publish(topic, QoS1, json)
//!                   └─ fails once the driver has exited (connection lost)
//!
//! disconnect()
//!   ├─ driver exited → drop the session (no DISCONNECT to send)
//!   └─ otherwise     → DISCONNECT, let the driver flush, abort after a grace period
//! ```
//!
//! The driver never reconnects on its own: a lost connection surfaces as a
//! publish error and the supervisor runs a full teardown/bring-up cycle.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use serde::Serialize;
use tokio::{task::JoinHandle, time};
use tracing::{debug, info, warn};

use super::TelemetrySink;
use crate::error::SinkError;
use crate::model::{DeviceIdentity, Reading};

/// Topic for time-series data.
pub const TELEMETRY_TOPIC: &str = "v1/devices/me/telemetry";
/// Topic for client-side device attributes.
pub const ATTRIBUTES_TOPIC: &str = "v1/devices/me/attributes";

/// How long `disconnect` lets the driver flush the DISCONNECT packet.
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);
/// Capacity of the client request queue.
const REQUEST_CAPACITY: usize = 64;

/// Connection parameters for [`ThingsBoardSink`].
#[derive(Clone, Debug)]
pub struct ThingsBoardSettings {
    pub host: String,
    pub port: u16,
    /// Device access token, sent as the MQTT username.
    pub token: String,
    pub client_id: String,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
}

struct Session {
    client: AsyncClient,
    driver: JoinHandle<()>,
}

/// MQTT-backed [`TelemetrySink`].
pub struct ThingsBoardSink {
    settings: ThingsBoardSettings,
    session: Option<Session>,
}

impl ThingsBoardSink {
    pub fn new(settings: ThingsBoardSettings) -> Self {
        Self {
            settings,
            session: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| !s.driver.is_finished())
    }

    fn options(&self) -> MqttOptions {
        let s = &self.settings;
        let mut options = MqttOptions::new(s.client_id.clone(), s.host.clone(), s.port);
        options.set_credentials(s.token.clone(), "");
        options.set_keep_alive(s.keep_alive);
        options
    }

    async fn publish<T: Serialize>(&mut self, topic: &str, value: &T) -> Result<(), SinkError> {
        let session = self.session.as_ref().ok_or(SinkError::NotConnected)?;
        if session.driver.is_finished() {
            return Err(SinkError::Publish {
                error: "connection lost".to_string(),
            });
        }

        let payload = serde_json::to_vec(value)?;
        session
            .client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| SinkError::Publish {
                error: e.to_string(),
            })
    }
}

impl Drop for ThingsBoardSink {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.driver.abort();
        }
    }
}

#[async_trait]
impl TelemetrySink for ThingsBoardSink {
    async fn connect(&mut self) -> Result<(), SinkError> {
        if let Some(old) = self.session.take() {
            old.driver.abort();
        }

        let (client, mut eventloop) = AsyncClient::new(self.options(), REQUEST_CAPACITY);
        let timeout = self.settings.connect_timeout;
        time::timeout(timeout, wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| SinkError::ConnectTimeout { timeout })??;

        let driver = tokio::spawn(drive(eventloop));
        self.session = Some(Session { client, driver });
        info!(
            host = %self.settings.host,
            port = self.settings.port,
            "connected to ThingsBoard"
        );
        Ok(())
    }

    async fn publish_attributes(&mut self, identity: &DeviceIdentity) -> Result<(), SinkError> {
        self.publish(ATTRIBUTES_TOPIC, identity).await?;
        debug!(%identity, "sent attributes");
        Ok(())
    }

    async fn publish_telemetry(&mut self, reading: &Reading) -> Result<(), SinkError> {
        self.publish(TELEMETRY_TOPIC, reading).await?;
        debug!(%reading, "sent telemetry");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), SinkError> {
        let Some(Session { client, mut driver }) = self.session.take() else {
            return Ok(());
        };
        if driver.is_finished() {
            debug!("connection already closed, nothing to disconnect");
            return Ok(());
        }

        let result = client
            .disconnect()
            .await
            .map_err(|e| SinkError::Disconnect {
                error: e.to_string(),
            });
        if time::timeout(DISCONNECT_GRACE, &mut driver).await.is_err() {
            driver.abort();
        }
        info!("disconnected from ThingsBoard");
        result
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), SinkError> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return match ack.code {
                    ConnectReturnCode::Success => Ok(()),
                    code => Err(SinkError::Rejected {
                        code: format!("{code:?}"),
                    }),
                };
            }
            Ok(_) => {}
            Err(e) => {
                return Err(SinkError::Connect {
                    error: e.to_string(),
                });
            }
        }
    }
}

async fn drive(mut eventloop: EventLoop) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("mqtt session closed");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "ThingsBoard connection lost");
                break;
            }
        }
    }
}
