// Unit tests for error module
// Conversions from library errors keep the message and record where they happened

use crate::error::MonitorError;

use hass_client::{ConfigError, HassError, HubConfig};

/// **VALUE**: A hub error converted with `?` keeps the original message.
///
/// **WHY THIS MATTERS**: The monitor prints only its own error on exit. If the
/// conversion dropped the inner text, "wrong token" would read as a bare "Hub Error".
#[test]
fn given_hass_error_when_converted_then_message_kept() {
    // GIVEN: An authentication failure
    let inner = HassError::authentication("Invalid access token");
    let inner_text = inner.to_string();

    // WHEN: Converting
    let error = MonitorError::from(inner);

    // THEN: Hub variant carrying the full inner text
    match &error {
        MonitorError::Hub { message, .. } => assert_eq!(message, &inner_text),
        other => panic!("Expected Hub variant, got {other:?}"),
    }
    assert!(error.to_string().starts_with("Hub Error: Authentication Error"));
}

#[test]
fn given_config_error_when_converted_then_config_variant() {
    let inner: ConfigError = HubConfig::new("").validate().unwrap_err();

    let error = MonitorError::from(inner);

    assert!(matches!(error, MonitorError::Config { .. }));
    assert!(error.to_string().contains("host cannot be empty"));
}

#[test]
fn given_converted_error_when_displayed_then_location_points_at_conversion() {
    let error = MonitorError::from(HassError::connection("refused"));

    let display = error.to_string();

    assert!(display.contains(file!()), "{display}");
}
