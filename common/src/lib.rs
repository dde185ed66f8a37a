//! Shared support types for the hub client workspace.
//!
//! Nothing in here knows about the hub protocol. The crate only carries the
//! pieces every other crate leans on:
//!
//! - [`ErrorLocation`] for call-site tracking in error values
//! - [`RedactedSecret`] for credentials that must never reach a log line

pub mod error;
pub mod redacted_secret;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_secret::RedactedSecret;

#[cfg(test)]
mod tests;
