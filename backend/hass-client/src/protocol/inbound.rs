use crate::error::HassError;

use serde::Deserialize;
use serde_json::Value;

/// A frame pushed by the hub, tagged by `type`.
///
/// Types this client does not know decode to [`ServerFrame::Unknown`] rather
/// than failing, so a newer hub cannot break the receive loop.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    AuthRequired {
        #[serde(default)]
        ha_version: Option<String>,
    },
    AuthOk {
        #[serde(default)]
        ha_version: Option<String>,
    },
    AuthInvalid {
        #[serde(default)]
        message: Option<String>,
    },
    Result {
        id: u64,
        success: bool,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<ResultError>,
    },
    Event {
        #[serde(default)]
        id: Option<u64>,
        event: EventBody,
    },
    #[serde(other)]
    Unknown,
}

impl ServerFrame {
    /// Decode one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`HassError::Protocol`] if the text is not JSON, has no `type`, or
    /// lacks a field its type requires.
    #[track_caller]
    pub fn parse(text: &str) -> Result<Self, HassError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Body of an `event` frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventBody {
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub time_fired: Option<String>,
}

/// `error` member of a failed `result` frame.
///
/// Older hubs send numeric codes, and some send a bare string or nothing at
/// all, so any JSON decodes. `raw` keeps the body exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub struct ResultError {
    pub code: String,
    pub message: String,
    pub raw: Value,
}

impl From<Value> for ResultError {
    fn from(raw: Value) -> Self {
        let (code, message) = match &raw {
            Value::Object(body) => (
                body.get("code").map(scalar_text).unwrap_or_default(),
                body.get("message").map(scalar_text).unwrap_or_default(),
            ),
            Value::Null => (String::new(), String::new()),
            other => (String::new(), scalar_text(other)),
        };
        Self { code, message, raw }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
