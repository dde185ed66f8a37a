use crate::helpers::{
    WAIT, accept, answer_initial_sync, bind_hub, client_sent_nothing_more, connected_client,
    eventually, push_state, recv_json, send_json,
};

use hass_client::{HassClient, HassError, HubCredential};

use common::RedactedSecret;

use std::time::Duration;

use serde_json::json;
use tokio::time::{Instant, timeout};

// ============================================================================
// HassClient::connect() - initial sync
// ============================================================================

/// **VALUE**: After `connect` returns, the cache holds the bulk state and follows
/// `state_changed` events.
///
/// **WHY THIS MATTERS**: Button rendering reads the cache only. If the seed or the
/// subscription were missing, every button would render blank or stale.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - `get_states` is never sent, or its result never reaches the cache
/// - The `state_changed` subscription is not made during connect
/// - Events are parsed but not applied
#[tokio::test]
async fn given_hub_without_auth_when_connected_then_cache_seeded_and_follows_events() {
    // GIVEN: A hub reporting light.a off
    let (client, mut ws) =
        connected_client(json!([{ "entity_id": "light.a", "state": "off" }])).await;

    // THEN: The seed is visible as soon as connect returns
    assert_eq!(
        client.get_state("light.a").map(|s| s.state),
        Some("off".to_string())
    );
    assert!(client.is_connected());

    // WHEN: The hub reports light.a on
    push_state(&mut ws, 1, "light.a", "on").await;

    // THEN: The cache follows
    eventually("light.a on", || {
        client.get_state("light.a").map(|s| s.state).as_deref() == Some("on")
    })
    .await;
    assert_eq!(client.cached_entity_count(), 1);
}

/// **VALUE**: `get_state` hands back every field the hub reported for the entity.
#[tokio::test]
async fn given_hub_record_with_extra_fields_when_connected_then_get_state_keeps_them() {
    let (client, mut ws) = connected_client(json!([{
        "entity_id": "climate.hall",
        "state": "heat",
        "attributes": { "temperature": 21 },
        "extra_field": { "x": 1 }
    }]))
    .await;

    let seeded = client.get_state("climate.hall").expect("climate.hall cached");
    assert_eq!(seeded.extra.get("extra_field"), Some(&json!({ "x": 1 })));
    assert_eq!(seeded.attribute("temperature"), Some(&json!(21)));

    // The same holds for records that arrive through state_changed
    send_json(
        &mut ws,
        json!({
            "id": 1,
            "type": "event",
            "event": {
                "event_type": "state_changed",
                "data": {
                    "entity_id": "climate.hall",
                    "new_state": { "entity_id": "climate.hall", "state": "off", "extra_field": { "x": 2 } }
                }
            }
        }),
    )
    .await;
    eventually("climate.hall off", || {
        client.get_state("climate.hall").map(|s| s.state).as_deref() == Some("off")
    })
    .await;
    assert_eq!(
        client
            .get_state("climate.hall")
            .and_then(|s| s.extra.get("extra_field").cloned()),
        Some(json!({ "x": 2 }))
    );
}

#[tokio::test]
async fn given_connected_client_when_entity_never_reported_then_get_state_none() {
    let (client, _ws) =
        connected_client(json!([{ "entity_id": "light.a", "state": "off" }])).await;

    assert!(client.get_state("light.unknown").is_none());
}

// ============================================================================
// HassClient::connect() - authentication
// ============================================================================

/// **VALUE**: A rejected credential fails `connect` with `Authentication`, and no
/// request frame is ever sent.
///
/// **WHY THIS MATTERS**: Sending commands on an unauthenticated socket gets the
/// connection dropped by the hub, and surfaces as a confusing connection error
/// instead of "wrong token".
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The receive loop or initial sync starts before the handshake verdict
/// - `auth_invalid` is ignored or mapped to a generic connection error
#[tokio::test]
async fn given_hub_rejecting_token_when_connecting_then_authentication_error_and_nothing_sent() {
    // GIVEN: A hub that rejects every credential
    let (listener, config) = bind_hub().await;
    let config = config.with_credential(HubCredential::AccessToken(RedactedSecret::new(
        "expired-token",
    )));

    let hub = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        send_json(&mut ws, json!({ "type": "auth_required", "ha_version": "2026.10.1" })).await;

        let auth = recv_json(&mut ws).await;
        assert_eq!(auth, json!({ "type": "auth", "access_token": "expired-token" }));

        send_json(&mut ws, json!({ "type": "auth_invalid", "message": "Invalid access token" }))
            .await;
        client_sent_nothing_more(&mut ws).await
    });

    // WHEN: Connecting
    let result = HassClient::connect(&config).await;

    // THEN: Authentication error, and the hub saw no request after the auth frame
    match result {
        Err(HassError::Authentication { message, .. }) => {
            assert!(message.contains("Invalid access token"), "{message}");
        }
        Err(other) => panic!("Expected Authentication error, got {other:?}"),
        Ok(_) => panic!("Expected Authentication error, got a connected client"),
    }
    assert!(
        hub.await.expect("Hub task panicked"),
        "Client must not send requests after auth_invalid"
    );
}

/// **VALUE**: With a legacy password configured, the auth frame carries
/// `api_password` and a successful verdict leads into the normal initial sync.
#[tokio::test]
async fn given_hub_accepting_password_when_connecting_then_connects_and_syncs() {
    // GIVEN: A hub that accepts the password
    let (listener, config) = bind_hub().await;
    let config = config.with_credential(HubCredential::ApiPassword(RedactedSecret::new("hunter2")));

    let hub = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        send_json(&mut ws, json!({ "type": "auth_required" })).await;

        let auth = recv_json(&mut ws).await;
        assert_eq!(auth, json!({ "type": "auth", "api_password": "hunter2" }));

        send_json(&mut ws, json!({ "type": "auth_ok", "ha_version": "2026.10.1" })).await;
        answer_initial_sync(&mut ws, json!([{ "entity_id": "switch.fan", "state": "on" }])).await;
        ws
    });

    // WHEN: Connecting
    let client = HassClient::connect(&config)
        .await
        .expect("Client failed to connect");
    let _ws = hub.await.expect("Hub task panicked");

    // THEN: Seeded as usual
    assert_eq!(
        client.get_state("switch.fan").map(|s| s.state),
        Some("on".to_string())
    );
}

#[tokio::test]
async fn given_hub_silent_after_auth_when_connecting_then_fails_within_handshake_timeout() {
    let (listener, config) = bind_hub().await;
    let config = config
        .with_credential(HubCredential::AccessToken(RedactedSecret::new("tok")))
        .with_handshake_timeout_secs(1);

    let hub = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let _auth = recv_json(&mut ws).await;
        // Never answer, and keep the socket open past the client's bound.
        tokio::time::sleep(WAIT).await;
        ws
    });

    let started = Instant::now();
    let result = timeout(WAIT, HassClient::connect(&config))
        .await
        .expect("connect must give up on its own");

    match result {
        Err(HassError::Connection { message, .. }) => {
            assert!(message.contains("no auth reply"), "{message}");
        }
        Err(other) => panic!("Expected Connection error, got {other:?}"),
        Ok(_) => panic!("Expected Connection error, got a connected client"),
    }
    assert!(started.elapsed() >= Duration::from_millis(900));
    hub.abort();
}

// ============================================================================
// HassClient::connect() - bounded initial sync
// ============================================================================

/// **VALUE**: A hub that never answers the initial sync does not block `connect`
/// past the init timeout, and the client stays usable.
///
/// **WHY THIS MATTERS**: A slow hub at startup should give a deck with blank
/// buttons that fill in later, not a deck that never starts.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The initial exchanges are awaited without a bound
/// - An init timeout is treated as fatal
#[tokio::test]
async fn given_hub_not_answering_sync_when_connecting_then_connect_returns_after_init_timeout() {
    // GIVEN: A hub that reads but never answers
    let (listener, config) = bind_hub().await;
    let config = config.with_init_timeout_secs(1);

    let hub = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let _subscribe = recv_json(&mut ws).await;
        let _get_states = recv_json(&mut ws).await;
        ws
    });

    // WHEN: Connecting
    let started = Instant::now();
    let client = timeout(WAIT, HassClient::connect(&config))
        .await
        .expect("connect must not hang")
        .expect("init timeout is not fatal");
    let elapsed = started.elapsed();
    let mut ws = hub.await.expect("Hub task panicked");

    // THEN: Returned after roughly the bound, empty cache, still connected
    assert!(elapsed >= Duration::from_millis(900), "{elapsed:?}");
    assert_eq!(client.cached_entity_count(), 0);
    assert!(client.is_connected());

    // THEN: Later events still fill the cache
    push_state(&mut ws, 1, "light.a", "on").await;
    eventually("light.a cached from event", || client.get_state("light.a").is_some()).await;
}

#[tokio::test]
async fn given_nothing_listening_when_connecting_then_connection_error() {
    let (listener, config) = bind_hub().await;
    drop(listener);

    let result = HassClient::connect(&config).await;

    assert!(matches!(result, Err(HassError::Connection { .. })));
}

#[tokio::test]
async fn given_invalid_config_when_connecting_then_connection_error_without_dialing() {
    let config = hass_client::HubConfig::new("");

    let result = HassClient::connect(&config).await;

    match result {
        Err(e @ HassError::Connection { .. }) => {
            assert!(e.to_string().contains("invalid hub config"), "{e}");
        }
        Err(other) => panic!("Expected Connection error, got {other:?}"),
        Ok(_) => panic!("Expected Connection error, got a connected client"),
    }
}

#[test]
fn client_handle_is_shareable_across_tasks() {
    fn assert_send_sync<T: Send + Sync + 'static>() {}
    assert_send_sync::<HassClient>();
}
