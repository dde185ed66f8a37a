use hass_client::{ConfigError, CoreError, HassError, HubConfig};

// ============================================================================
// HassError - public interface
// ============================================================================

/// **VALUE**: Every error prints its category, message and where it was raised.
///
/// **WHY THIS MATTERS**: These strings end up in the monitor's log file, which is
/// all there is to go on when a deck misbehaves on someone's desk.
#[test]
fn given_request_failure_when_displayed_then_includes_code_message_and_location() {
    let error = HassError::request_failure(12, "not_found", "Service light.explode not found.");

    let display = error.to_string();

    assert!(display.starts_with("Request Failure:"), "{display}");
    assert!(display.contains("request 12"));
    assert!(display.contains("not_found"));
    assert!(display.contains("light.explode"));
    assert!(display.contains(file!()), "location missing: {display}");
}

#[test]
fn given_each_variant_when_classified_then_fatal_only_for_session_enders() {
    let cases = [
        (HassError::connection("reset"), true, "connection"),
        (HassError::authentication("bad token"), true, "authentication"),
        (HassError::connection_closed("gone"), true, "connection_closed"),
        (HassError::timeout("slow", 5000), false, "timeout"),
        (HassError::protocol("garbage"), false, "protocol"),
        (HassError::request_failure(1, "x", "y"), false, "request_failure"),
    ];

    for (error, fatal, category) in cases {
        assert_eq!(error.is_fatal(), fatal, "{error}");
        assert_eq!(error.error_category(), category);
    }
}

#[test]
fn given_timeout_error_when_displayed_then_includes_bound() {
    let error = HassError::timeout("initial sync incomplete", 5000);
    assert!(error.to_string().contains("after 5000ms"));
}

#[test]
fn given_invalid_json_when_converted_then_protocol_error() {
    let parse_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();

    let error = HassError::from(parse_error);

    assert!(matches!(error, HassError::Protocol { .. }));
    assert_eq!(error.request_id(), None);
}

#[test]
fn given_config_error_when_wrapped_in_core_error_then_display_passes_through() {
    let config_error: ConfigError = HubConfig::new("hub")
        .with_port(0)
        .validate()
        .unwrap_err();
    let expected = config_error.to_string();

    let core: CoreError = config_error.into();

    assert_eq!(core.to_string(), expected);
    assert!(expected.contains("port cannot be 0"));
}
