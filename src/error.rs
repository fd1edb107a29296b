//! Error types used by the bridge runtime and its collaborators.
//!
//! - [`ConfigError`]: configuration could not be loaded or validated (fatal).
//! - [`LogInitError`]: logging could not be installed (fatal).
//! - [`DeviceError`]: raised by a [`SensorPort`](crate::SensorPort).
//! - [`SinkError`]: raised by a [`TelemetrySink`](crate::TelemetrySink).
//! - [`CycleError`]: why one bring-up/steady-state cycle of the supervisor ended.
//!
//! Every enum provides `as_label` for logs.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// # Configuration loading and validation errors.
///
/// Always fatal: without valid operating parameters the process exits.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// The file exists but could not be parsed or lacks required keys.
    #[error("invalid configuration: {0}")]
    InvalidFormat(#[from] Box<figment::Error>),

    /// A value parsed fine but is out of range.
    #[error("configuration validation failed: {message}")]
    Validation { message: String },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::FileNotFound { .. } => "config_not_found",
            ConfigError::InvalidFormat(_) => "config_invalid_format",
            ConfigError::Validation { .. } => "config_validation",
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::InvalidFormat(Box::new(err))
    }
}

/// # Errors raised while installing the logging pipeline.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LogInitError {
    #[error("cannot create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open rolling log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("global subscriber already installed: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// # Errors raised by a sensor port.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DeviceError {
    /// An operation needing an open bus was called before `connect`.
    #[error("device not connected")]
    NotConnected,

    /// The bus device could not be opened.
    #[error("cannot open bus {path}: {error}")]
    Open { path: String, error: String },

    /// A bus transfer failed.
    #[error("bus transfer failed: {error}")]
    Bus { error: String },

    /// A received data word did not match its checksum.
    #[error("crc mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Crc { expected: u8, actual: u8 },
}

impl DeviceError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DeviceError::NotConnected => "device_not_connected",
            DeviceError::Open { .. } => "device_open",
            DeviceError::Bus { .. } => "device_bus",
            DeviceError::Crc { .. } => "device_crc",
        }
    }
}

/// # Errors raised by a telemetry sink.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SinkError {
    /// A publish was attempted before `connect`.
    #[error("sink not connected")]
    NotConnected,

    /// The transport failed while establishing the session.
    #[error("connection failed: {error}")]
    Connect { error: String },

    /// The server answered but refused the session (bad token, etc.).
    #[error("connection refused by server: {code}")]
    Rejected { code: String },

    /// No session acknowledgement arrived in time.
    #[error("no connection acknowledgement within {timeout:?}")]
    ConnectTimeout { timeout: Duration },

    /// A message could not be handed to the transport.
    #[error("publish failed: {error}")]
    Publish { error: String },

    /// The DISCONNECT request could not be handed to a live session.
    #[error("disconnect failed: {error}")]
    Disconnect { error: String },

    /// A payload could not be encoded.
    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SinkError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SinkError::NotConnected => "sink_not_connected",
            SinkError::Connect { .. } => "sink_connect",
            SinkError::Rejected { .. } => "sink_rejected",
            SinkError::ConnectTimeout { .. } => "sink_connect_timeout",
            SinkError::Publish { .. } => "sink_publish",
            SinkError::Disconnect { .. } => "sink_disconnect",
            SinkError::Encode(_) => "sink_encode",
        }
    }
}

/// # Why a supervisor cycle ended.
///
/// All variants are recoverable: the supervisor tears down both collaborators,
/// waits for the next backoff delay and retries the whole bring-up.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CycleError {
    /// Either collaborator failed to connect.
    #[error("bring-up failed: {error}")]
    BringUp { error: String },

    /// The sensor refused to start continuous measurement.
    #[error("start measurement failed: {error}")]
    StartMeasurement { error: String },

    /// A collaborator failed while announcing, polling or publishing.
    #[error("steady state failed: {error}")]
    Session { error: String },
}

impl CycleError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use sen5x_bridge::CycleError;
    ///
    /// let err = CycleError::BringUp { error: "no ack".into() };
    /// assert_eq!(err.as_label(), "bring_up_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CycleError::BringUp { .. } => "bring_up_failed",
            CycleError::StartMeasurement { .. } => "start_measurement_failed",
            CycleError::Session { .. } => "session_failed",
        }
    }

    pub(crate) fn session(err: impl std::fmt::Display) -> Self {
        CycleError::Session {
            error: err.to_string(),
        }
    }
}
