//! Logging configuration using tracing
//!
//! Library code only emits events through `tracing`; a host that wants the
//! notifier's own diagnostics on disk calls [`init`] once at startup.

use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result, ResultExt};

/// Environment variable controlling the log filter
pub const LOG_ENV_VAR: &str = "BUGSNAG_LOG";

/// Log file name inside the log directory
pub const LOG_FILE_NAME: &str = "bugsnag.log";

/// Initialize the logging subsystem
///
/// Logs are written to `<data_local_dir>/bugsnag/logs/`.
/// Log level is controlled by the `BUGSNAG_LOG` environment variable.
///
/// # Examples
/// ```bash
/// BUGSNAG_LOG=debug my-app
/// BUGSNAG_LOG=bugsnag_core=trace my-app
/// ```
pub fn init() -> Result<()> {
    init_with_directory(&log_directory())
}

/// Initialize logging into a specific directory.
///
/// Fails with [`Error::Logging`] if a global subscriber is already installed.
pub fn init_with_directory(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_NAME);

    // Default to info for our crates, warn for everything else
    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new("bugsnag_core=info,bugsnag_report=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .try_init()
        .map_err(|e| Error::logging(e.to_string()))?;

    tracing::info!(
        "Notifier logging started at {} in {}",
        chrono::Local::now().to_rfc3339(),
        log_dir.display()
    );

    Ok(())
}

/// Get the log directory path
pub fn log_directory() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("bugsnag").join("logs")
}

/// Get the log file path for the current day
pub fn current_log_file() -> PathBuf {
    log_directory().join(LOG_FILE_NAME)
}
