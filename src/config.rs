//! # Bridge configuration with file and environment sources using figment.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults for the optional sections
//! 2. YAML file (`config/config.yml`, or the path in `SEN5X_BRIDGE_CONFIG`)
//! 3. Environment variables prefixed with `SEN5X_` (`__` separates nested keys,
//!    e.g. `SEN5X_BACKOFF__MAX_SECS=600`)
//!
//! The required keys (`i2c_port`, `tb_host`, `tb_port`, `tb_token`,
//! `publish_interval`) have no defaults. The loaded value is validated and then
//! treated as immutable for the lifetime of the process.
//!
//! ## Example file
//! ```yaml
//! i2c_port: /dev/i2c-1
//! tb_host: thingsboard.local
//! tb_port: 1883
//! tb_token: A1_TEST_TOKEN
//! publish_interval: 10
//! backoff:
//!   max_secs: 600
//! logging:
//!   level: debug
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use tracing_appender::rolling::Rotation;

use crate::core::SupervisorConfig;
use crate::error::ConfigError;
use crate::policies::{BackoffPolicy, JitterPolicy};
use crate::sink::ThingsBoardSettings;

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yml";
/// Environment variable overriding [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_ENV: &str = "SEN5X_BRIDGE_CONFIG";
/// Prefix of environment variables overriding individual keys.
pub const ENV_PREFIX: &str = "SEN5X_";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// I²C bus device path (e.g. `/dev/i2c-1`).
    pub i2c_port: String,
    /// ThingsBoard MQTT host.
    pub tb_host: String,
    /// ThingsBoard MQTT port.
    pub tb_port: u16,
    /// Device access token.
    pub tb_token: String,
    /// Pause between steady-state iterations, in seconds.
    pub publish_interval: u64,
    #[serde(default)]
    pub backoff: BackoffConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Event bus ring size.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

/// Reconnect delay progression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackoffConfig {
    pub first_secs: u64,
    pub max_secs: u64,
    pub factor: f64,
    pub jitter: JitterPolicy,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            first_secs: 5,
            max_secs: 300,
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

/// Fan-cleaning schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub cleaning_interval_hours: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            cleaning_interval_hours: 24,
        }
    }
}

/// MQTT session parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MqttConfig {
    pub client_id: String,
    pub keep_alive_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            client_id: "sen5x-bridge".to_owned(),
            keep_alive_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

/// Log file rotation period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(value: LogRotation) -> Self {
        match value {
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Directory for rotated log files.
    pub directory: PathBuf,
    pub file_prefix: String,
    pub rotation: LogRotation,
    /// Number of rotated files kept on disk.
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            directory: PathBuf::from("logs"),
            file_prefix: "sen5x_reader.log".to_owned(),
            rotation: LogRotation::Daily,
            max_files: 7,
        }
    }
}

fn default_bus_capacity() -> usize {
    1024
}

impl Config {
    /// Pause between steady-state iterations.
    pub fn publish_interval(&self) -> Duration {
        Duration::from_secs(self.publish_interval)
    }

    /// Reconnect delay policy.
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_secs(self.backoff.first_secs),
            max: Duration::from_secs(self.backoff.max_secs),
            factor: self.backoff.factor,
            jitter: self.backoff.jitter,
        }
    }

    /// Minimum time between fan cleanings.
    pub fn cleaning_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance.cleaning_interval_hours.saturating_mul(3600))
    }

    /// Runtime parameters for the supervisor.
    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            publish_interval: self.publish_interval(),
            backoff: self.backoff_policy(),
            cleaning_interval: self.cleaning_interval(),
            bus_capacity: self.bus_capacity,
        }
    }

    /// Connection parameters for the ThingsBoard sink.
    pub fn thingsboard_settings(&self) -> ThingsBoardSettings {
        ThingsBoardSettings {
            host: self.tb_host.clone(),
            port: self.tb_port,
            token: self.tb_token.clone(),
            client_id: self.mqtt.client_id.clone(),
            keep_alive: Duration::from_secs(self.mqtt.keep_alive_secs),
            connect_timeout: Duration::from_secs(self.mqtt.connect_timeout_secs),
        }
    }
}

/// Configuration loader for one file plus environment overrides.
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Loader for an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loader for the path named by `SEN5X_BRIDGE_CONFIG`, falling back to
    /// [`DEFAULT_CONFIG_PATH`].
    pub fn from_env() -> Self {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::new(path)
    }

    /// File this loader reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate the configuration.
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.path.is_file() {
            return Err(ConfigError::FileNotFound {
                path: self.path.clone(),
            });
        }

        let config: Config = Figment::new()
            .merge(Yaml::file(&self.path))
            .merge(Env::prefixed(ENV_PREFIX).split("__").ignore(&["bridge_config"]))
            .extract()?;

        validate_config(&config)?;
        Ok(config)
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation {
        message: message.to_owned(),
    }
}

/// Validate the final configuration.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.i2c_port.trim().is_empty() {
        return Err(invalid("i2c_port must not be empty"));
    }
    if config.tb_host.trim().is_empty() {
        return Err(invalid("tb_host must not be empty"));
    }
    if config.tb_port == 0 {
        return Err(invalid("tb_port must be greater than 0"));
    }
    if config.tb_token.is_empty() {
        return Err(invalid("tb_token must not be empty"));
    }
    if config.publish_interval == 0 {
        return Err(invalid("publish_interval must be greater than 0"));
    }

    let backoff = &config.backoff;
    if backoff.first_secs == 0 {
        return Err(invalid("backoff.first_secs must be greater than 0"));
    }
    if backoff.max_secs < backoff.first_secs {
        return Err(invalid("backoff.max_secs must not be less than backoff.first_secs"));
    }
    if !backoff.factor.is_finite() || backoff.factor < 1.0 {
        return Err(invalid("backoff.factor must be a finite number >= 1.0"));
    }

    if config.maintenance.cleaning_interval_hours == 0 {
        return Err(invalid("maintenance.cleaning_interval_hours must be greater than 0"));
    }
    if config.mqtt.client_id.is_empty() {
        return Err(invalid("mqtt.client_id must not be empty"));
    }
    if config.mqtt.keep_alive_secs < 5 {
        return Err(invalid("mqtt.keep_alive_secs must be at least 5"));
    }
    if config.mqtt.connect_timeout_secs == 0 {
        return Err(invalid("mqtt.connect_timeout_secs must be greater than 0"));
    }
    if config.logging.max_files == 0 {
        return Err(invalid("logging.max_files must be greater than 0"));
    }
    if config.bus_capacity == 0 {
        return Err(invalid("bus_capacity must be greater than 0"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::io::Write;

    const MINIMAL: &str = "\
i2c_port: /dev/i2c-1
tb_host: thingsboard.local
tb_port: 1883
tb_token: secret
publish_interval: 10
";

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".yml")
            .tempfile()
            .expect("create temp config");
        file.write_all(contents.as_bytes()).expect("write temp config");
        file
    }

    fn minimal() -> Config {
        serde_json::from_value(serde_json::json!({
            "i2c_port": "/dev/i2c-1",
            "tb_host": "thingsboard.local",
            "tb_port": 1883,
            "tb_token": "secret",
            "publish_interval": 10,
        }))
        .expect("minimal config")
    }

    #[test]
    fn test_minimal_file_gets_defaults() {
        let file = write_config(MINIMAL);
        let config = ConfigLoader::new(file.path()).load().expect("load");

        assert_eq!(config.i2c_port, "/dev/i2c-1");
        assert_eq!(config.publish_interval(), Duration::from_secs(10));
        assert_eq!(config.backoff_policy(), BackoffPolicy::default());
        assert_eq!(config.cleaning_interval(), Duration::from_secs(24 * 3600));
        assert_eq!(config.mqtt, MqttConfig::default());
        assert_eq!(config.logging, LoggingConfig::default());
        assert_eq!(config.bus_capacity, 1024);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.yml");

        let err = ConfigLoader::new(&path).load().unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { path: p } if p == path));
    }

    #[test]
    fn test_missing_required_key_is_invalid_format() {
        let file = write_config("i2c_port: /dev/i2c-1\ntb_host: h\ntb_port: 1883\n");
        let err = ConfigLoader::new(file.path()).load().unwrap_err();
        assert_eq!(err.as_label(), "config_invalid_format");
    }

    #[test]
    fn test_zero_publish_interval_rejected() {
        let file = write_config(&MINIMAL.replace("publish_interval: 10", "publish_interval: 0"));
        let err = ConfigLoader::new(file.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_validation_of_backoff_bounds() {
        let mut config = minimal();
        assert!(validate_config(&config).is_ok());

        config.backoff.max_secs = 1;
        assert!(validate_config(&config).is_err());

        config = minimal();
        config.backoff.factor = 0.5;
        assert!(validate_config(&config).is_err());

        config = minimal();
        config.backoff.factor = f64::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_of_connection_fields() {
        let mut config = minimal();
        config.tb_token.clear();
        assert!(validate_config(&config).is_err());

        config = minimal();
        config.tb_port = 0;
        assert!(validate_config(&config).is_err());

        config = minimal();
        config.mqtt.keep_alive_secs = 1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_optional_sections_parse() {
        let file = write_config(&format!(
            "{MINIMAL}backoff:\n  first_secs: 2\n  max_secs: 60\n  jitter: full\n\
             maintenance:\n  cleaning_interval_hours: 12\n\
             logging:\n  rotation: hourly\n  max_files: 3\n"
        ));
        let config = ConfigLoader::new(file.path()).load().expect("load");

        let policy = config.backoff_policy();
        assert_eq!(policy.first, Duration::from_secs(2));
        assert_eq!(policy.max, Duration::from_secs(60));
        assert_eq!(policy.factor, 2.0);
        assert_eq!(policy.jitter, JitterPolicy::Full);
        assert_eq!(config.cleaning_interval(), Duration::from_secs(12 * 3600));
        assert_eq!(config.logging.rotation, LogRotation::Hourly);
        assert_eq!(config.logging.max_files, 3);
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yml", MINIMAL)?;
            jail.set_env("SEN5X_TB_PORT", "8883");
            jail.set_env("SEN5X_BACKOFF__MAX_SECS", "600");

            let config = ConfigLoader::new("config.yml")
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.tb_port, 8883);
            assert_eq!(config.backoff.max_secs, 600);
            assert_eq!(config.tb_host, "thingsboard.local");
            Ok(())
        });
    }

    #[test]
    fn test_config_path_from_env() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.yml", MINIMAL)?;
            jail.set_env(CONFIG_PATH_ENV, "custom.yml");

            let loader = ConfigLoader::from_env();
            assert_eq!(loader.path(), Path::new("custom.yml"));
            let config = loader.load().map_err(|e| e.to_string())?;
            assert_eq!(config.tb_token, "secret");
            Ok(())
        });
    }

    #[test]
    fn test_accessors_map_sections() {
        let config = minimal();
        let tb = config.thingsboard_settings();
        assert_eq!(tb.host, "thingsboard.local");
        assert_eq!(tb.port, 1883);
        assert_eq!(tb.token, "secret");
        assert_eq!(tb.client_id, "sen5x-bridge");
        assert_eq!(tb.connect_timeout, Duration::from_secs(10));

        let sup = config.supervisor_config();
        assert_eq!(sup.publish_interval, Duration::from_secs(10));
        assert_eq!(sup.bus_capacity, 1024);
    }
}
