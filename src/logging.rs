//! # Logging pipeline.
//!
//! One `tracing` registry with two fmt layers:
//! - stdout, human-readable;
//! - a rolling file under `logging.directory`, written through a non-blocking
//!   worker (no ANSI colors).
//!
//! The filter comes from `RUST_LOG` when set, else from `logging.level`.
//! Keep the returned [`WorkerGuard`] alive for the whole process; dropping it
//! flushes and stops the file writer.

use tracing_appender::{non_blocking::WorkerGuard, rolling::RollingFileAppender};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::error::LogInitError;

/// Installs the global subscriber.
///
/// Fails if the directory cannot be created, the filter does not parse, or a
/// global subscriber is already installed.
pub fn init(cfg: &LoggingConfig) -> Result<WorkerGuard, LogInitError> {
    std::fs::create_dir_all(&cfg.directory).map_err(|source| LogInitError::Directory {
        path: cfg.directory.clone(),
        source,
    })?;

    let appender = RollingFileAppender::builder()
        .rotation(cfg.rotation.into())
        .filename_prefix(cfg.file_prefix.as_str())
        .max_log_files(cfg.max_files)
        .build(&cfg.directory)?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter(&cfg.level)?)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()?;

    Ok(guard)
}

/// `RUST_LOG` when set and valid, else the configured directive.
fn filter(level: &str) -> Result<EnvFilter, LogInitError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(level)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogRotation;

    #[test]
    fn test_unwritable_directory_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").expect("write blocker");

        let cfg = LoggingConfig {
            directory: blocker.join("logs"),
            rotation: LogRotation::Never,
            ..LoggingConfig::default()
        };
        let err = init(&cfg).unwrap_err();
        assert!(matches!(err, LogInitError::Directory { .. }));
    }
}
