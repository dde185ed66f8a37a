use crate::config::{HubConfig, HubCredential};
use crate::error::config::ConfigError;

use std::env;
use std::io::Write;
use std::time::Duration;

use serial_test::serial;
use tempfile::NamedTempFile;

const ENV_VARS: [&str; 6] = [
    "HASS_HOST",
    "HASS_PORT",
    "HASS_SECURE",
    "HASS_ACCESS_TOKEN",
    "HASS_API_PASSWORD",
    "HASS_INIT_TIMEOUT_SECS",
];

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

fn clear_env() {
    for var in ENV_VARS {
        // SAFETY: every test touching the environment is #[serial].
        unsafe { env::remove_var(var) };
    }
}

fn set_env(var: &str, value: &str) {
    // SAFETY: every test touching the environment is #[serial].
    unsafe { env::set_var(var, value) };
}

/// **VALUE**: A minimal file fills every omitted field with its default.
#[test]
fn given_minimal_file_when_loaded_then_defaults_applied() {
    // GIVEN: Only the host
    let file = write_config(r#"{ "host": "homeassistant.local" }"#);

    // WHEN: Loading
    let config = HubConfig::load(file.path()).expect("valid config");

    // THEN: Defaults
    assert_eq!(config.host, "homeassistant.local");
    assert_eq!(config.port, 8123);
    assert!(!config.secure);
    assert!(config.credential.is_none());
    assert_eq!(config.init_timeout(), Duration::from_secs(5));
    assert_eq!(config.handshake_timeout(), Duration::from_secs(10));
    assert_eq!(config.max_concurrent_handlers, None);
}

#[test]
fn given_full_file_when_loaded_then_every_field_read() {
    let file = write_config(
        r#"{
            "host": "10.0.0.5",
            "port": 443,
            "secure": true,
            "credential": { "access_token": "eyJ0eXAi" },
            "init_timeout_secs": 2,
            "handshake_timeout_secs": 3,
            "max_concurrent_handlers": 8
        }"#,
    );

    let config = HubConfig::load(file.path()).expect("valid config");

    assert_eq!(config.port, 443);
    assert!(config.secure);
    match &config.credential {
        Some(HubCredential::AccessToken(token)) => assert_eq!(token.expose(), "eyJ0eXAi"),
        other => panic!("Expected access token, got {other:?}"),
    }
    assert_eq!(config.init_timeout_secs, 2);
    assert_eq!(config.handshake_timeout_secs, 3);
    assert_eq!(config.max_concurrent_handlers, Some(8));
}

#[test]
fn given_api_password_credential_when_loaded_then_password_variant() {
    let file = write_config(r#"{ "host": "hub", "credential": { "api_password": "hunter2" } }"#);

    let config = HubConfig::load(file.path()).expect("valid config");

    assert!(matches!(
        config.credential,
        Some(HubCredential::ApiPassword(ref password)) if password.expose() == "hunter2"
    ));
}

/// **VALUE**: Debug output of a loaded config never shows the secret.
#[test]
fn given_config_with_token_when_debug_printed_then_secret_redacted() {
    let config = HubConfig::new("hub")
        .with_credential(HubCredential::AccessToken(common::RedactedSecret::new("super-secret")));

    let printed = format!("{config:?}");

    assert!(!printed.contains("super-secret"));
    assert!(printed.contains("REDACTED"));
}

#[test]
fn given_missing_file_when_loaded_then_read_error() {
    let result = HubConfig::load(std::path::Path::new("/nonexistent/hub.json"));
    assert!(matches!(result, Err(ConfigError::ReadError { .. })));
}

#[test]
fn given_invalid_json_when_loaded_then_parse_error() {
    let file = write_config("{ host: ");
    let result = HubConfig::load(file.path());
    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// **VALUE**: Each invalid value is rejected before any socket is opened.
#[test]
fn given_invalid_values_when_validated_then_validation_error() {
    let cases = [
        ("empty host", HubConfig::new("  ")),
        ("port zero", HubConfig::new("hub").with_port(0)),
        ("zero init timeout", HubConfig::new("hub").with_init_timeout_secs(0)),
        (
            "zero handshake timeout",
            HubConfig::new("hub").with_handshake_timeout_secs(0),
        ),
        ("zero handler bound", HubConfig::new("hub").with_max_concurrent_handlers(0)),
        (
            "empty token",
            HubConfig::new("hub")
                .with_credential(HubCredential::AccessToken(common::RedactedSecret::new(""))),
        ),
        ("host with spaces", HubConfig::new("not a host")),
    ];

    for (name, config) in cases {
        assert!(
            matches!(config.validate(), Err(ConfigError::ValidationError { .. })),
            "{name} should fail validation"
        );
    }
}

#[test]
fn given_invalid_file_values_when_loaded_then_validation_error() {
    let file = write_config(r#"{ "host": "hub", "port": 0 }"#);
    let result = HubConfig::load(file.path());
    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}

#[test]
fn given_plain_and_secure_configs_when_url_built_then_scheme_follows_secure_flag() {
    let plain = HubConfig::new("homeassistant.local");
    let secure = HubConfig::new("hub.example.com").with_port(443).with_secure(true);

    assert_eq!(
        plain.websocket_url().expect("valid url").as_str(),
        "ws://homeassistant.local:8123/api/websocket"
    );
    // The default port for wss is elided by the URL parser.
    assert_eq!(
        secure.websocket_url().expect("valid url").as_str(),
        "wss://hub.example.com/api/websocket"
    );
}

/// **VALUE**: `from_env` reads every supported variable.
#[test]
#[serial]
fn given_env_vars_when_from_env_then_config_built() {
    // GIVEN: A full environment
    clear_env();
    set_env("HASS_HOST", "192.168.1.20");
    set_env("HASS_PORT", "8300");
    set_env("HASS_SECURE", "true");
    set_env("HASS_INIT_TIMEOUT_SECS", "9");
    set_env("HASS_API_PASSWORD", "pw");

    // WHEN: Building from env
    let config = HubConfig::from_env().expect("valid env config");
    clear_env();

    // THEN: All values applied
    assert_eq!(config.host, "192.168.1.20");
    assert_eq!(config.port, 8300);
    assert!(config.secure);
    assert_eq!(config.init_timeout_secs, 9);
    assert!(matches!(config.credential, Some(HubCredential::ApiPassword(_))));
}

#[test]
#[serial]
fn given_token_and_password_in_env_when_from_env_then_token_wins() {
    clear_env();
    set_env("HASS_HOST", "hub");
    set_env("HASS_ACCESS_TOKEN", "tok");
    set_env("HASS_API_PASSWORD", "pw");

    let config = HubConfig::from_env().expect("valid env config");
    clear_env();

    assert!(matches!(
        config.credential,
        Some(HubCredential::AccessToken(ref token)) if token.expose() == "tok"
    ));
}

#[test]
#[serial]
fn given_no_host_in_env_when_from_env_then_env_error() {
    clear_env();

    let result = HubConfig::from_env();

    match result {
        Err(ConfigError::EnvError { variable, .. }) => assert_eq!(variable, "HASS_HOST"),
        other => panic!("Expected EnvError for HASS_HOST, got {other:?}"),
    }
}

#[test]
#[serial]
fn given_unparseable_port_in_env_when_from_env_then_env_error_names_variable() {
    clear_env();
    set_env("HASS_HOST", "hub");
    set_env("HASS_PORT", "eighty");

    let result = HubConfig::from_env();
    clear_env();

    match result {
        Err(ConfigError::EnvError {
            variable, reason, ..
        }) => {
            assert_eq!(variable, "HASS_PORT");
            assert!(reason.contains("eighty"));
        }
        other => panic!("Expected EnvError for HASS_PORT, got {other:?}"),
    }
}

#[test]
fn given_zero_handshake_timeout_in_file_when_loaded_then_rejected_with_reason() {
    let file = write_config(r#"{ "host": "hub", "handshake_timeout_secs": 0 }"#);

    match HubConfig::load(file.path()) {
        Err(ConfigError::ValidationError { reason, .. }) => {
            assert!(reason.contains("handshake_timeout_secs"), "{reason}");
        }
        other => panic!("Expected ValidationError, got {other:?}"),
    }
}
