//! # sen5x-bridge
//!
//! **sen5x-bridge** forwards readings from a Sensirion SEN5x environmental
//! sensor (I²C) to a ThingsBoard instance (MQTT), unattended, reconnecting
//! forever with exponential backoff and running the sensor's fan cleaning on
//! its own 24h schedule.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────────┐                    ┌──────────────────────┐
//!     │   SensorPort     │                    │   TelemetrySink      │
//!     │ Sen5xPort<I2c>   │                    │  ThingsBoardSink     │
//!     └────────┬─────────┘                    └──────────┬───────────┘
//!              │ owned                                   │ owned
//!              ▼                                         ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (retry state machine)                                 │
//! │  - BackoffPolicy + previous delay (never reset)                   │
//! │  - MaintenanceSchedule (fan cleaning, survives reconnects)        │
//! │  - Session (announce, poll/maintain/publish loop)                 │
//! │  - CancellationToken (stop request)                               │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   │ Publishes events:
//!                                   │ BringUpStarting, Connected, TelemetryPublished,
//!                                   │ CycleFailed, BackoffScheduled, CleaningStarted, ...
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │              (capacity: SupervisorConfig::bus_capacity)           │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                          ┌────────┴────────┐
//!                          ▼                 ▼
//!                      LogWriter          custom ...
//! ```
//!
//! ### Lifecycle
//! ```text
//! Config ──► Supervisor::builder(...).build() ──► serve() / run(token)
//!
//! loop:
//!   bring_up ─► announce ─► steady loop ─► teardown ─┬─► (stop)  return
//!                                                    └─► (error) backoff ─► bring_up
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use sen5x_bridge::BackoffPolicy;
//!
//! let policy = BackoffPolicy::default();
//! let first = policy.next(None);
//! let second = policy.next(Some(first));
//! assert_eq!(first, Duration::from_secs(5));
//! assert_eq!(second, Duration::from_secs(10));
//! ```

mod config;
mod core;
mod device;
mod error;
mod events;
mod logging;
mod model;
mod policies;
mod sink;
mod subscribers;

// ---- Public re-exports ----

pub use config::{
    BackoffConfig, CONFIG_PATH_ENV, Config, ConfigLoader, DEFAULT_CONFIG_PATH, ENV_PREFIX,
    LogRotation, LoggingConfig, MaintenanceConfig, MqttConfig,
};
pub use core::{MaintenanceSchedule, Supervisor, SupervisorBuilder, SupervisorConfig};
pub use device::{ADDRESS, Sen5x, Sen5xPort, SensorPort, Version, open_linux};
pub use error::{ConfigError, CycleError, DeviceError, LogInitError, SinkError};
pub use events::{Bus, Event, EventKind};
pub use logging::init as init_logging;
pub use model::{DeviceIdentity, Poll, Reading};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use sink::{ATTRIBUTES_TOPIC, TELEMETRY_TOPIC, TelemetrySink, ThingsBoardSettings, ThingsBoardSink};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
