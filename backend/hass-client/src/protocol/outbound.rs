use crate::config::HubCredential;

use serde::Serialize;

/// First frame on an authenticated connection.
///
/// Borrowed from the configured credential only for as long as it takes to
/// serialize it. Never log this value.
#[derive(Serialize)]
#[serde(tag = "type", rename = "auth")]
pub struct AuthFrame<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_password: Option<&'a str>,
}

impl<'a> AuthFrame<'a> {
    pub fn new(credential: &'a HubCredential) -> Self {
        match credential {
            HubCredential::AccessToken(token) => Self {
                access_token: Some(token.expose()),
                api_password: None,
            },
            HubCredential::ApiPassword(password) => Self {
                access_token: None,
                api_password: Some(password.expose()),
            },
        }
    }
}

/// Payload of a request frame, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestBody {
    GetStates,
    SubscribeEvents {
        event_type: String,
    },
    CallService {
        domain: String,
        service: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        service_data: Option<ServiceData>,
    },
}

impl RequestBody {
    pub fn subscribe_events(event_type: impl Into<String>) -> Self {
        RequestBody::SubscribeEvents {
            event_type: event_type.into(),
        }
    }

    /// `entity_id` of `None` (or empty) calls the service without targeting an entity.
    pub fn call_service(
        domain: impl Into<String>,
        service: impl Into<String>,
        entity_id: Option<&str>,
    ) -> Self {
        RequestBody::CallService {
            domain: domain.into(),
            service: service.into(),
            service_data: entity_id
                .filter(|id| !id.is_empty())
                .map(|id| ServiceData {
                    entity_id: id.to_string(),
                }),
        }
    }

    /// Wire name of the frame type, for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestBody::GetStates => "get_states",
            RequestBody::SubscribeEvents { .. } => "subscribe_events",
            RequestBody::CallService { .. } => "call_service",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceData {
    pub entity_id: String,
}

/// A request as written to the socket: `{"id": N, "type": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestFrame {
    pub id: u64,
    #[serde(flatten)]
    pub body: RequestBody,
}

impl RequestFrame {
    pub fn new(id: u64, body: RequestBody) -> Self {
        Self { id, body }
    }
}
