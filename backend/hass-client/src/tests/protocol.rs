use crate::config::HubCredential;
use crate::error::HassError;
use crate::protocol::{AuthFrame, RequestBody, RequestFrame, ServerFrame};

use common::RedactedSecret;

use serde_json::{Value, json};

fn to_value<T: serde::Serialize>(frame: &T) -> Value {
    serde_json::to_value(frame).expect("frame serializes")
}

/// **VALUE**: Request frames put `id` and `type` at the top level, with
/// type-specific fields beside them.
///
/// **WHY THIS MATTERS**: The hub does not accept nested payloads; a frame shaped
/// `{"id":1,"body":{...}}` would be rejected as an unknown command.
#[test]
fn given_call_service_with_entity_when_serialized_then_flat_frame_with_service_data() {
    // GIVEN: A toggle request for light.a
    let frame = RequestFrame::new(
        7,
        RequestBody::call_service("homeassistant", "toggle", Some("light.a")),
    );

    // WHEN/THEN: It serializes flat
    assert_eq!(
        to_value(&frame),
        json!({
            "id": 7,
            "type": "call_service",
            "domain": "homeassistant",
            "service": "toggle",
            "service_data": { "entity_id": "light.a" }
        })
    );
}

#[test]
fn given_call_service_without_entity_when_serialized_then_no_service_data() {
    for entity_id in [None, Some("")] {
        let frame = RequestFrame::new(3, RequestBody::call_service("script", "goodnight", entity_id));
        let value = to_value(&frame);
        assert!(value.get("service_data").is_none(), "{value}");
        assert_eq!(value["type"], "call_service");
    }
}

#[test]
fn given_get_states_and_subscribe_when_serialized_then_match_wire_shape() {
    assert_eq!(
        to_value(&RequestFrame::new(1, RequestBody::GetStates)),
        json!({ "id": 1, "type": "get_states" })
    );
    assert_eq!(
        to_value(&RequestFrame::new(2, RequestBody::subscribe_events("state_changed"))),
        json!({ "id": 2, "type": "subscribe_events", "event_type": "state_changed" })
    );
}

/// **VALUE**: The auth frame carries exactly the configured credential field and no id.
#[test]
fn given_each_credential_kind_when_auth_frame_serialized_then_correct_field_used() {
    let token = HubCredential::AccessToken(RedactedSecret::new("tok"));
    let password = HubCredential::ApiPassword(RedactedSecret::new("pw"));

    assert_eq!(
        to_value(&AuthFrame::new(&token)),
        json!({ "type": "auth", "access_token": "tok" })
    );
    assert_eq!(
        to_value(&AuthFrame::new(&password)),
        json!({ "type": "auth", "api_password": "pw" })
    );
}

#[test]
fn given_result_frames_when_parsed_then_success_and_error_decoded() {
    let ok = ServerFrame::parse(r#"{"id":4,"type":"result","success":true,"result":null}"#)
        .expect("valid result");
    assert_eq!(
        ok,
        ServerFrame::Result {
            id: 4,
            success: true,
            result: None,
            error: None
        }
    );

    let failed = ServerFrame::parse(
        r#"{"id":5,"type":"result","success":false,"error":{"code":"not_found","message":"Service not found."}}"#,
    )
    .expect("valid result");
    match failed {
        ServerFrame::Result {
            id,
            success,
            error: Some(error),
            ..
        } => {
            assert_eq!(id, 5);
            assert!(!success);
            assert_eq!(error.code, "not_found");
        }
        other => panic!("Expected failed result, got {other:?}"),
    }
}

#[test]
fn given_failed_result_with_numeric_code_when_parsed_then_code_text_and_raw_body_kept() {
    let frame = ServerFrame::parse(
        r#"{"id":3,"type":"result","success":false,"error":{"code":3,"message":"Entity not found","translation_key":"x"}}"#,
    )
    .expect("numeric code must not fail the frame");

    match frame {
        ServerFrame::Result {
            error: Some(error), ..
        } => {
            assert_eq!(error.code, "3");
            assert_eq!(error.message, "Entity not found");
            assert_eq!(
                error.raw,
                json!({ "code": 3, "message": "Entity not found", "translation_key": "x" })
            );
        }
        other => panic!("Expected failed result, got {other:?}"),
    }
}

#[test]
fn given_failed_result_with_string_body_when_parsed_then_message_taken_from_it() {
    let frame = ServerFrame::parse(r#"{"id":9,"type":"result","success":false,"error":"boom"}"#)
        .expect("string body must not fail the frame");

    match frame {
        ServerFrame::Result {
            error: Some(error), ..
        } => {
            assert_eq!(error.code, "");
            assert_eq!(error.message, "boom");
            assert_eq!(error.raw, json!("boom"));
        }
        other => panic!("Expected failed result, got {other:?}"),
    }
}

#[test]
fn given_event_frame_when_parsed_then_type_and_data_extracted() {
    let frame = ServerFrame::parse(
        r#"{"id":1,"type":"event","event":{"event_type":"state_changed","data":{"entity_id":"light.a"},"origin":"LOCAL","time_fired":"2026-10-17T08:00:00+00:00"}}"#,
    )
    .expect("valid event");

    match frame {
        ServerFrame::Event { id, event } => {
            assert_eq!(id, Some(1));
            assert_eq!(event.event_type, "state_changed");
            assert_eq!(event.data, json!({ "entity_id": "light.a" }));
            assert_eq!(event.origin.as_deref(), Some("LOCAL"));
        }
        other => panic!("Expected event, got {other:?}"),
    }
}

/// **VALUE**: Unrecognised frame types decode to `Unknown` instead of failing.
///
/// **BUG THIS CATCHES**: Would catch removal of the `#[serde(other)]` catch-all, which
/// would turn every new hub frame type into a protocol error.
#[test]
fn given_unrecognised_type_when_parsed_then_unknown() {
    assert_eq!(
        ServerFrame::parse(r#"{"id":9,"type":"pong"}"#).expect("parses"),
        ServerFrame::Unknown
    );
}

#[test]
fn given_auth_frames_when_parsed_then_decoded() {
    assert_eq!(
        ServerFrame::parse(r#"{"type":"auth_required","ha_version":"2026.10.1"}"#).unwrap(),
        ServerFrame::AuthRequired {
            ha_version: Some("2026.10.1".to_string())
        }
    );
    assert_eq!(
        ServerFrame::parse(r#"{"type":"auth_invalid","message":"Invalid access token"}"#).unwrap(),
        ServerFrame::AuthInvalid {
            message: Some("Invalid access token".to_string())
        }
    );
}

/// **VALUE**: Malformed frames become `Protocol` errors rather than panics.
#[test]
fn given_malformed_text_when_parsed_then_protocol_error() {
    for text in [
        "not json at all",
        r#"{"id":1}"#,
        r#"{"type":"result","success":true}"#,
        r#"{"type":"event"}"#,
    ] {
        let result = ServerFrame::parse(text);
        assert!(
            matches!(result, Err(HassError::Protocol { .. })),
            "{text} should be a protocol error, got {result:?}"
        );
    }
}
