use crate::error::config::ConfigError;
use crate::{DEFAULT_HUB_PORT, HUB_WEBSOCKET_PATH};

use common::{ErrorLocation, RedactedSecret};

use std::env;
use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;
use url::Url;

const ENV_HOST: &str = "HASS_HOST";
const ENV_PORT: &str = "HASS_PORT";
const ENV_SECURE: &str = "HASS_SECURE";
const ENV_ACCESS_TOKEN: &str = "HASS_ACCESS_TOKEN";
const ENV_API_PASSWORD: &str = "HASS_API_PASSWORD";
const ENV_INIT_TIMEOUT_SECS: &str = "HASS_INIT_TIMEOUT_SECS";

// ============================================
// CONFIG STRUCTS
// ============================================

/// Credential presented in the `auth` frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HubCredential {
    /// Long-lived access token.
    AccessToken(RedactedSecret),
    /// Legacy API password.
    ApiPassword(RedactedSecret),
}

/// Where the hub lives and how to talk to it.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Use `wss://` instead of `ws://`.
    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub credential: Option<HubCredential>,

    /// Bound on the initial subscribe + bulk-sync exchanges.
    #[serde(default = "default_init_timeout_secs")]
    pub init_timeout_secs: u64,

    /// Bound on waiting for `auth_ok`/`auth_invalid`.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,

    /// Upper bound on event handlers executing at once. `None` is unbounded.
    #[serde(default)]
    pub max_concurrent_handlers: Option<usize>,
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_port() -> u16 {
    DEFAULT_HUB_PORT
}
fn default_init_timeout_secs() -> u64 {
    5
}
fn default_handshake_timeout_secs() -> u64 {
    10
}

// ============================================
// IMPLEMENTATION
// ============================================

impl HubConfig {
    /// Plain config for `host` on the default port, no TLS, no credential.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            secure: false,
            credential: None,
            init_timeout_secs: default_init_timeout_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            max_concurrent_handlers: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_credential(mut self, credential: HubCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn with_init_timeout_secs(mut self, secs: u64) -> Self {
        self.init_timeout_secs = secs;
        self
    }

    pub fn with_handshake_timeout_secs(mut self, secs: u64) -> Self {
        self.handshake_timeout_secs = secs;
        self
    }

    pub fn with_max_concurrent_handlers(mut self, limit: usize) -> Self {
        self.max_concurrent_handlers = Some(limit);
        self
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// Load config from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, is not valid JSON, or
    /// fails [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                source: e,
            })?;

        let config: HubConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        config.validate()?;

        info!("Hub config loaded from {}", path.display());
        Ok(config)
    }

    /// Build config from `HASS_*` environment variables, after loading `.env`
    /// from the working directory if one exists.
    ///
    /// `HASS_HOST` is required. `HASS_ACCESS_TOKEN` wins over `HASS_API_PASSWORD`
    /// when both are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvError`] for a missing host or a value that does
    /// not parse, and [`ConfigError::ValidationError`] if the result is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        let host = env::var(ENV_HOST).map_err(|e| ConfigError::EnvError {
            location: ErrorLocation::from(Location::caller()),
            variable: ENV_HOST,
            reason: e.to_string(),
        })?;

        let mut config = HubConfig::new(host);

        if let Some(port) = parse_env::<u16>(ENV_PORT)? {
            config.port = port;
        }
        if let Some(secure) = parse_env::<bool>(ENV_SECURE)? {
            config.secure = secure;
        }
        if let Some(secs) = parse_env::<u64>(ENV_INIT_TIMEOUT_SECS)? {
            config.init_timeout_secs = secs;
        }

        config.credential = match (env::var(ENV_ACCESS_TOKEN), env::var(ENV_API_PASSWORD)) {
            (Ok(token), _) => Some(HubCredential::AccessToken(RedactedSecret::new(token))),
            (Err(_), Ok(password)) => Some(HubCredential::ApiPassword(RedactedSecret::new(password))),
            _ => None,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "host cannot be empty".to_string(),
            });
        }

        if self.port == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "port cannot be 0".to_string(),
            });
        }

        if self.init_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "init_timeout_secs must be at least 1".to_string(),
            });
        }

        if self.handshake_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "handshake_timeout_secs must be at least 1".to_string(),
            });
        }

        if self.max_concurrent_handlers == Some(0) {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "max_concurrent_handlers cannot be 0".to_string(),
            });
        }

        if let Some(credential) = &self.credential {
            let secret = match credential {
                HubCredential::AccessToken(secret) | HubCredential::ApiPassword(secret) => secret,
            };
            if secret.is_empty() {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: "credential cannot be empty".to_string(),
                });
            }
        }

        self.websocket_url().map(|_| ())
    }

    /// `ws://host:port/api/websocket`, or `wss://` when `secure` is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the host does not form a valid URL.
    pub fn websocket_url(&self) -> Result<Url, ConfigError> {
        let scheme = if self.secure { "wss" } else { "ws" };
        let raw = format!("{scheme}://{}:{}{HUB_WEBSOCKET_PATH}", self.host, self.port);

        Url::parse(&raw).map_err(|e| ConfigError::ValidationError {
            location: ErrorLocation::from(Location::caller()),
            reason: format!("Invalid hub URL '{raw}': {e}"),
        })
    }
}

fn parse_env<T>(variable: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::EnvError {
                location: ErrorLocation::from(Location::caller()),
                variable,
                reason: format!("'{raw}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}
