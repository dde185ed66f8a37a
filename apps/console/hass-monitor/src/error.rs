use common::ErrorLocation;

use hass_client::{ConfigError, HassError};

use thiserror::Error;

/// Errors that end the monitor.
///
/// Library errors are flattened to a message so the exit report reads the same
/// whatever layer failed, while the location of the conversion is kept.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Error from this app (log setup, signal handling)
    #[error("Monitor Error: {message} {location}")]
    Monitor {
        message: String,
        location: ErrorLocation,
    },

    /// Hub configuration could not be loaded
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// Error from the hub client
    #[error("Hub Error: {message} {location}")]
    Hub {
        message: String,
        location: ErrorLocation,
    },
}

impl From<ConfigError> for MonitorError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        MonitorError::Config {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<HassError> for MonitorError {
    #[track_caller]
    fn from(error: HassError) -> Self {
        MonitorError::Hub {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
