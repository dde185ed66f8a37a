use crate::ErrorLocation;

use thiserror::Error as ThisError;

/// Raised when something tries to write a [`RedactedSecret`](crate::RedactedSecret) out.
#[derive(Debug, ThisError)]
pub enum RedactError {
    #[error("Redaction Error: refused to serialize {what} {location}")]
    Serialization {
        what: &'static str,
        location: ErrorLocation,
    },
}
