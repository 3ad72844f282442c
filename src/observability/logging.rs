//! Structured logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber
//! - Text or JSON output on stdout
//! - Optional rolling log file behind a non-blocking writer
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - A second installation fails with [`LoggingError::AlreadyInstalled`]

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::tools::log::LogConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Error type for logging set-up.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level `{level}`: {reason}")]
    Level { level: String, reason: String },

    #[error("invalid log rotation `{0}`, expected minutely, hourly, daily or never")]
    Rotation(String),

    #[error("cannot open log file: {0}")]
    File(#[from] InitError),

    #[error("a global subscriber is already installed")]
    AlreadyInstalled,
}

/// Parse the configured level into a filter directive.
pub fn level_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(level).map_err(|e| LoggingError::Level {
        level: level.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a rotation name.
pub fn rotation(name: &str) -> Result<Rotation, LoggingError> {
    match name.to_ascii_lowercase().as_str() {
        "minutely" => Ok(Rotation::MINUTELY),
        "hourly" => Ok(Rotation::HOURLY),
        "daily" => Ok(Rotation::DAILY),
        "never" => Ok(Rotation::NEVER),
        _ => Err(LoggingError::Rotation(name.to_string())),
    }
}

/// Install the global subscriber described by `config`.
///
/// The returned guard flushes the file writer when dropped; it is `None`
/// when no log directory is configured.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.level)?,
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(if config.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    });

    let mut guard = None;
    if let Some(directory) = &config.directory {
        let mut builder = RollingFileAppender::builder()
            .rotation(rotation(&config.rotation)?)
            .filename_prefix(config.file_prefix.as_str());
        if let Some(max_files) = config.max_files {
            builder = builder.max_log_files(max_files);
        }
        let appender = builder.build(directory)?;
        let (writer, file_guard) = tracing_appender::non_blocking(appender);

        layers.push(if config.json {
            fmt::layer().json().with_writer(writer).with_ansi(false).boxed()
        } else {
            fmt::layer().with_writer(writer).with_ansi(false).boxed()
        });
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rotation_names() {
        assert_eq!(rotation("Daily").unwrap(), Rotation::DAILY);
        assert_eq!(rotation("never").unwrap(), Rotation::NEVER);
        assert!(matches!(rotation("weekly"), Err(LoggingError::Rotation(_))));
    }

    #[test]
    fn validates_levels() {
        assert!(level_filter("info").is_ok());
        assert!(level_filter("toolbelt=debug,tower_http=warn").is_ok());
        assert!(matches!(
            level_filter("toolbelt=loud"),
            Err(LoggingError::Level { .. })
        ));
    }
}
