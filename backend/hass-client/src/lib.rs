//! Protocol client for a home-automation hub's websocket API.
//!
//! One [`HassClient`](hub::HassClient) owns one socket. Over it the client
//! multiplexes request/reply exchanges, fans out pushed events to registered
//! handlers, and keeps a local cache of entity states current.

pub mod config;
pub mod error;
pub mod hub;
pub mod protocol;

#[cfg(test)]
mod tests;

pub use config::{HubConfig, HubCredential};
pub use error::{ConfigError, CoreError, HassError};
pub use hub::{EntityState, HandlerResult, HassClient, PendingReply};

pub const DEFAULT_HUB_PORT: u16 = 8123;
pub const HUB_API_PATH: &str = "/api";
pub const HUB_WEBSOCKET_PATH: &str = const_format::concatcp!(HUB_API_PATH, "/websocket");
