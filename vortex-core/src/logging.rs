//! Logging setup for hosts and the vortex binaries
//!
//! The tracker itself only emits through the `tracing` macros. Host
//! applications with their own subscriber can ignore this module.
//!
//! Files go to `$XDG_STATE_HOME/vortex/` as `vortex.<date>.log`, rotated
//! daily with a week of history.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};

const LOG_FILE_PREFIX: &str = "vortex";
const LOG_FILE_SUFFIX: &str = "log";
const LOG_FILES_KEPT: usize = 7;

/// Install a subscriber writing to the daily log file.
///
/// `RUST_LOG` takes precedence over `config.level`. Keep the returned guard
/// alive for as long as logs should be written.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(LOG_FILES_KEPT)
        .build(&log_dir)
        .map_err(|e| Error::Config(format!("failed to open log file: {}", e)))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter(config))
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_names(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {}", e)))?;

    tracing::debug!(log_dir = %log_dir.display(), level = %config.level, "File logging enabled");
    Ok(LoggingGuard { _guard: guard })
}

/// Log to stderr instead of a file (CLI verbose mode)
pub fn init_stderr(config: &LoggingConfig) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(config))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Log through the test harness's captured output
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Directory holding the daily log files
pub fn log_dir() -> PathBuf {
    Config::state_dir()
}

fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Flushes buffered log lines when dropped
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_dir_is_state_dir() {
        assert_eq!(log_dir(), Config::state_dir());
        assert!(log_dir().ends_with("vortex"));
    }
}
