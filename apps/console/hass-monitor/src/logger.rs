//! Console + file logging for the monitor.

use crate::error::MonitorError;

use common::ErrorLocation;

use std::io::stdout;
use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();
static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = "hass-monitor.log";

/// Overrides the default level, e.g. `HASS_MONITOR_LOG_LEVEL=trace`.
pub const LOG_LEVEL_ENV: &str = "HASS_MONITOR_LOG_LEVEL";

#[cfg(debug_assertions)]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Level named by `value` (as read from [`LOG_LEVEL_ENV`]), or the build default.
///
/// # Errors
///
/// Returns [`MonitorError::Monitor`] if `value` is not a level name.
#[track_caller]
pub fn level_from(value: Option<&str>) -> Result<LevelFilter, MonitorError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(DEFAULT_LOG_LEVEL),
        Some(name) => name.parse().map_err(|_| MonitorError::Monitor {
            message: format!("{LOG_LEVEL_ENV}={name} is not a log level"),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

/// Installs the global logger. Later calls warn and return Ok.
pub fn initialize(log_dir: &Path, level: LevelFilter) -> Result<(), MonitorError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("Logger already initialized");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = dispatch(log_dir, level).and_then(|dispatch| {
            dispatch.apply().map_err(|e| MonitorError::Monitor {
                message: format!("Failed to initialize logger: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })
        });
        if result.is_ok() {
            info!("Logging at {level} to {}", log_dir.join(LOG_FILE_NAME).display());
        }
    });

    result
}

/// Colored hub traffic on stdout, plain text with source lines in the file.
#[track_caller]
pub fn dispatch(log_dir: &Path, level: LevelFilter) -> Result<Dispatch, MonitorError> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);
    let log_file = fern::log_file(&log_file_path).map_err(|e| MonitorError::Monitor {
        message: format!("Failed to create log file {}: {e}", log_file_path.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let colors = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let console = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{target}]",
                date = format_rfc3339(SystemTime::now()),
                level = colors.color(record.level()),
                target = record.target(),
            ))
        })
        .chain(stdout());

    let file = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0)
            ))
        })
        .chain(log_file);

    // Socket stack frame chatter is capped at info.
    let socket_level = level.min(LevelFilter::Info);

    Ok(Dispatch::new()
        .level(level)
        .level_for("tungstenite", socket_level)
        .level_for("tokio_tungstenite", socket_level)
        .level_for("rustls", socket_level)
        .chain(console)
        .chain(file))
}
