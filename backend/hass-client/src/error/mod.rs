pub mod config;
pub mod hass;

pub use config::ConfigError;
pub use hass::HassError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Hass(#[from] hass::HassError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}
