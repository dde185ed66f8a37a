//! Error types for the hub connection.
//!
//! Key design decisions:
//! - Fatal vs. non-fatal is a property of the variant (`is_fatal()`), not of
//!   where the error was raised
//! - `RequestFailure` keeps the hub's error `code` as-is so callers can match on it
//! - All errors include ErrorLocation for debugging
//! - `#[track_caller]` for automatic location capture

use common::ErrorLocation;

use thiserror::Error as ThisError;
use tokio_tungstenite::tungstenite::Error as WsError;

/// Errors surfaced by the hub client.
#[derive(Debug, ThisError)]
pub enum HassError {
    /// Socket-level failure. Fatal to the session, never retried.
    #[error("Connection Error: {message} {location}")]
    Connection {
        message: String,
        location: ErrorLocation,
    },

    /// The hub rejected the configured credential.
    #[error("Authentication Error: {message} {location}")]
    Authentication {
        message: String,
        location: ErrorLocation,
    },

    /// A bounded wait elapsed.
    #[error("Timeout Error: {message} after {timeout_ms}ms {location}")]
    Timeout {
        message: String,
        timeout_ms: u64,
        location: ErrorLocation,
    },

    /// A frame could not be encoded, decoded, or interpreted.
    #[error("Protocol Error: {message} {location}")]
    Protocol {
        message: String,
        location: ErrorLocation,
    },

    /// The hub answered request `id` with `success: false`.
    #[error("Request Failure: request {id} failed with '{code}': {message} {location}")]
    RequestFailure {
        id: u64,
        code: String,
        message: String,
        location: ErrorLocation,
    },

    /// The connection went away before a reply arrived.
    #[error("Connection Closed Error: {message} {location}")]
    ConnectionClosed {
        message: String,
        location: ErrorLocation,
    },
}

impl HassError {
    #[track_caller]
    pub fn connection(message: impl Into<String>) -> Self {
        HassError::Connection {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn authentication(message: impl Into<String>) -> Self {
        HassError::Authentication {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn timeout(message: impl Into<String>, timeout_ms: u64) -> Self {
        HassError::Timeout {
            message: message.into(),
            timeout_ms,
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn protocol(message: impl Into<String>) -> Self {
        HassError::Protocol {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn request_failure(id: u64, code: impl Into<String>, message: impl Into<String>) -> Self {
        HassError::RequestFailure {
            id,
            code: code.into(),
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn connection_closed(message: impl Into<String>) -> Self {
        HassError::ConnectionClosed {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    /// Whether this error ends the session.
    ///
    /// Timeouts, protocol faults and per-request failures are isolated to the
    /// frame or request that caused them.
    pub fn is_fatal(&self) -> bool {
        match self {
            HassError::Connection { .. } => true,
            HassError::Authentication { .. } => true,
            HassError::ConnectionClosed { .. } => true,
            HassError::Timeout { .. } => false,
            HassError::Protocol { .. } => false,
            HassError::RequestFailure { .. } => false,
        }
    }

    /// Short stable label, suitable for log fields.
    pub fn error_category(&self) -> &'static str {
        match self {
            HassError::Connection { .. } => "connection",
            HassError::Authentication { .. } => "authentication",
            HassError::Timeout { .. } => "timeout",
            HassError::Protocol { .. } => "protocol",
            HassError::RequestFailure { .. } => "request_failure",
            HassError::ConnectionClosed { .. } => "connection_closed",
        }
    }

    /// The request id, for errors tied to one request.
    pub fn request_id(&self) -> Option<u64> {
        match self {
            HassError::RequestFailure { id, .. } => Some(*id),
            _ => None,
        }
    }
}

impl From<WsError> for HassError {
    #[track_caller]
    fn from(error: WsError) -> Self {
        HassError::Connection {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<serde_json::Error> for HassError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        HassError::Protocol {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
