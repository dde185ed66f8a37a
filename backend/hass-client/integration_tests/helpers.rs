//! Test helpers for driving a client against a scripted hub.
//!
//! The fake hub is a plain websocket server on an ephemeral port. Each test
//! accepts the client's socket and plays the hub's side of the exchange by
//! hand:
//! - Receiving and asserting on request frames
//! - Sending results and events
//! - Answering the initial subscribe + state sync

use hass_client::{HassClient, HubConfig};

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Instant, sleep, timeout};
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message};

pub type HubSocket = WebSocketStream<TcpStream>;

/// Upper bound on any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// Test helper: Bind a hub on an ephemeral port and return a config pointing at it.
pub async fn bind_hub() -> (TcpListener, HubConfig) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake hub");
    let port = listener.local_addr().expect("bound address").port();

    let config = HubConfig::new("127.0.0.1")
        .with_port(port)
        .with_init_timeout_secs(2)
        .with_handshake_timeout_secs(2);

    (listener, config)
}

/// Test helper: Accept the client's websocket.
pub async fn accept(listener: &TcpListener) -> HubSocket {
    let (stream, _) = timeout(WAIT, listener.accept())
        .await
        .expect("Client never connected")
        .expect("Failed to accept connection");
    accept_async(stream)
        .await
        .expect("Websocket handshake failed")
}

/// Test helper: Send one JSON frame to the client.
pub async fn send_json(ws: &mut HubSocket, frame: Value) {
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .expect("Failed to send frame");
}

/// Test helper: Receive the next text frame from the client as JSON.
pub async fn recv_json(ws: &mut HubSocket) -> Value {
    loop {
        let msg = timeout(WAIT, ws.next())
            .await
            .expect("Timed out waiting for a client frame")
            .expect("Client closed the socket")
            .expect("Error receiving frame");

        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("Client sent invalid JSON");
        }
    }
}

/// Test helper: Send a successful `result` for request `id`.
pub async fn reply_ok(ws: &mut HubSocket, id: u64, result: Value) {
    send_json(
        ws,
        json!({ "id": id, "type": "result", "success": true, "result": result }),
    )
    .await;
}

/// Test helper: Push a `state_changed` event for `entity_id`.
pub async fn push_state(ws: &mut HubSocket, subscription: u64, entity_id: &str, state: &str) {
    send_json(
        ws,
        json!({
            "id": subscription,
            "type": "event",
            "event": {
                "event_type": "state_changed",
                "data": {
                    "entity_id": entity_id,
                    "new_state": { "entity_id": entity_id, "state": state }
                },
                "origin": "LOCAL",
                "time_fired": "2026-10-17T08:00:00+00:00"
            }
        }),
    )
    .await;
}

/// Test helper: Play the hub's side of the initial sync.
///
/// Expects `subscribe_events(state_changed)` as id 1 and `get_states` as id 2,
/// and answers them with `states` as the bulk result.
pub async fn answer_initial_sync(ws: &mut HubSocket, states: Value) {
    let subscribe = recv_json(ws).await;
    assert_eq!(subscribe["id"], 1);
    assert_eq!(subscribe["type"], "subscribe_events");
    assert_eq!(subscribe["event_type"], "state_changed");

    let get_states = recv_json(ws).await;
    assert_eq!(get_states["id"], 2);
    assert_eq!(get_states["type"], "get_states");

    reply_ok(ws, 1, Value::Null).await;
    reply_ok(ws, 2, states).await;
}

/// Test helper: Connect a client to a hub that answers the initial sync with `states`.
pub async fn connected_client(states: Value) -> (HassClient, HubSocket) {
    let (listener, config) = bind_hub().await;

    let hub = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        answer_initial_sync(&mut ws, states).await;
        ws
    });

    let client = HassClient::connect(&config)
        .await
        .expect("Client failed to connect");
    let ws = hub.await.expect("Hub task panicked");

    (client, ws)
}

/// Test helper: Poll `check` until it holds, panicking after [`WAIT`].
pub async fn eventually(what: &str, check: impl Fn() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !check() {
        if Instant::now() > deadline {
            panic!("Timed out waiting for: {what}");
        }
        sleep(Duration::from_millis(10)).await;
    }
}

/// Test helper: Check whether the client has gone away without sending
/// another text frame.
pub async fn client_sent_nothing_more(ws: &mut HubSocket) -> bool {
    loop {
        match timeout(Duration::from_millis(500), ws.next()).await {
            Err(_) => return true,
            Ok(None) => return true,
            Ok(Some(Err(_))) => return true,
            Ok(Some(Ok(Message::Close(_)))) => return true,
            Ok(Some(Ok(Message::Text(_)))) => return false,
            Ok(Some(Ok(_))) => continue,
        }
    }
}
