use crate::helpers::{WAIT, connected_client, eventually, push_state, recv_json, reply_ok, send_json};

use hass_client::{HandlerResult, HassError};

use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::timeout;

// ============================================================================
// HassClient::subscribe()
// ============================================================================

/// **VALUE**: `subscribe` asks the hub for the event type, and the handler
/// receives the `data` of each matching event.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The handler is registered but `subscribe_events` never sent
/// - The handler is given the whole frame instead of `event.data`
/// - Events of other types reach the handler
#[tokio::test]
async fn given_subscribed_handler_when_matching_event_arrives_then_handler_gets_data() {
    // GIVEN: A connected client
    let (client, mut ws) = connected_client(json!([])).await;
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();

    // WHEN: Subscribing to automation_triggered
    let (subscribed, request) = tokio::join!(
        client.subscribe("automation_triggered", move |data: Value| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(data);
                HandlerResult::Ok(())
            }
        }),
        async {
            let request = recv_json(&mut ws).await;
            reply_ok(&mut ws, 3, Value::Null).await;
            request
        }
    );

    // THEN: The subscribe frame went out and was acknowledged
    assert!(subscribed.is_ok());
    assert_eq!(
        request,
        json!({ "id": 3, "type": "subscribe_events", "event_type": "automation_triggered" })
    );

    // WHEN: An unrelated event and then a matching one arrive
    push_state(&mut ws, 1, "light.a", "on").await;
    send_json(
        &mut ws,
        json!({
            "id": 3,
            "type": "event",
            "event": {
                "event_type": "automation_triggered",
                "data": { "name": "Night mode", "entity_id": "automation.night" }
            }
        }),
    )
    .await;

    // THEN: Only the matching event's data is delivered
    let data = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(data, json!({ "name": "Night mode", "entity_id": "automation.night" }));
    assert!(timeout(std::time::Duration::from_millis(100), rx.recv()).await.is_err());
}

/// **VALUE**: Subscribing twice to the same type sends two frames and both
/// handlers see every event.
#[tokio::test]
async fn given_same_type_subscribed_twice_when_event_arrives_then_both_frames_sent_and_both_handlers_run() {
    // GIVEN: A connected client
    let (client, mut ws) = connected_client(json!([])).await;
    let (tx, mut rx) = mpsc::unbounded_channel::<&'static str>();

    // WHEN: Two handlers subscribe to call_service
    for (label, id) in [("first", 3_u64), ("second", 4)] {
        let tx = tx.clone();
        let (subscribed, request) = tokio::join!(
            client.subscribe("call_service", move |_data: Value| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(label);
                    HandlerResult::Ok(())
                }
            }),
            async {
                let request = recv_json(&mut ws).await;
                reply_ok(&mut ws, id, Value::Null).await;
                request
            }
        );
        assert!(subscribed.is_ok());
        assert_eq!(request["id"], id);
        assert_eq!(request["event_type"], "call_service");
    }
    assert_eq!(client.handler_count("call_service"), 2);

    // THEN: One event reaches both
    send_json(
        &mut ws,
        json!({ "id": 3, "type": "event", "event": { "event_type": "call_service", "data": {} } }),
    )
    .await;

    let mut seen = vec![
        timeout(WAIT, rx.recv()).await.unwrap().unwrap(),
        timeout(WAIT, rx.recv()).await.unwrap().unwrap(),
    ];
    seen.sort_unstable();
    assert_eq!(seen, vec!["first", "second"]);
}

/// **VALUE**: `on_event` listens on the connection's existing `state_changed`
/// subscription without asking the hub for a second one.
///
/// **BUG THIS CATCHES**: Would catch `on_event` sending `subscribe_events`, which
/// makes the hub deliver every state change twice.
#[tokio::test]
async fn given_on_event_handler_when_state_changes_then_handler_runs_without_new_subscription() {
    // GIVEN: A handler attached with on_event
    let (client, mut ws) = connected_client(json!([])).await;
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    client.on_event("state_changed", move |data: Value| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(data);
            HandlerResult::Ok(())
        }
    });
    assert_eq!(client.handler_count("state_changed"), 2);

    // WHEN: A state change arrives on the initial subscription
    push_state(&mut ws, 1, "light.a", "on").await;

    // THEN: The handler sees it and nothing was sent to the hub
    let data = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(data["entity_id"], "light.a");
    assert_eq!(client.pending_requests(), 0);
    assert!(
        timeout(std::time::Duration::from_millis(200), recv_json(&mut ws))
            .await
            .is_err(),
        "on_event must not send a frame"
    );
}

#[tokio::test]
async fn given_hub_refusing_subscription_when_subscribing_then_request_failure() {
    let (client, mut ws) = connected_client(json!([])).await;

    let (subscribed, _) = tokio::join!(
        client.subscribe("not_an_event", |_data: Value| async { HandlerResult::Ok(()) }),
        async {
            let request = recv_json(&mut ws).await;
            send_json(
                &mut ws,
                json!({
                    "id": request["id"],
                    "type": "result",
                    "success": false,
                    "error": { "code": "invalid_format", "message": "bad event type" }
                }),
            )
            .await;
        }
    );

    assert!(matches!(subscribed, Err(HassError::RequestFailure { .. })));
    assert!(client.is_connected());
}

/// **VALUE**: A failing handler does not stop later events from being handled.
#[tokio::test]
async fn given_failing_handler_when_events_arrive_then_loop_keeps_processing() {
    // GIVEN: A handler that always errors
    let (client, mut ws) = connected_client(json!([{ "entity_id": "light.a", "state": "off" }])).await;
    let (subscribed, _) = tokio::join!(
        client.subscribe("state_changed", |_data: Value| async {
            HandlerResult::Err("renderer unavailable".into())
        }),
        async {
            let _ = recv_json(&mut ws).await;
            reply_ok(&mut ws, 3, Value::Null).await;
        }
    );
    assert!(subscribed.is_ok());

    // WHEN: Several events arrive
    push_state(&mut ws, 1, "light.a", "on").await;
    push_state(&mut ws, 1, "light.a", "off").await;
    push_state(&mut ws, 1, "light.b", "on").await;

    // THEN: The cache saw all of them and the session is intact
    eventually("light.b cached", || client.get_state("light.b").is_some()).await;
    assert_eq!(
        client.get_state("light.a").map(|s| s.state),
        Some("off".to_string())
    );
    assert!(client.is_connected());
}

#[tokio::test]
async fn given_malformed_frame_when_received_then_dropped_and_session_continues() {
    let (client, mut ws) = connected_client(json!([])).await;

    ws_send_text(&mut ws, "{ this is not json").await;
    push_state(&mut ws, 1, "light.a", "on").await;

    eventually("light.a cached after bad frame", || client.get_state("light.a").is_some()).await;
    assert!(client.is_connected());
}

#[tokio::test]
async fn given_entity_removed_on_hub_when_event_arrives_then_dropped_from_cache() {
    let (client, mut ws) = connected_client(json!([
        { "entity_id": "light.a", "state": "on" },
        { "entity_id": "light.b", "state": "on" }
    ]))
    .await;

    send_json(
        &mut ws,
        json!({
            "id": 1,
            "type": "event",
            "event": {
                "event_type": "state_changed",
                "data": { "entity_id": "light.b", "old_state": { "state": "on" }, "new_state": null }
            }
        }),
    )
    .await;

    eventually("light.b removed", || client.get_state("light.b").is_none()).await;
    let all = client.get_all_states();
    assert_eq!(all.len(), 1);
    assert!(all.contains_key("light.a"));
}

async fn ws_send_text(ws: &mut crate::helpers::HubSocket, text: &str) {
    use futures_util::SinkExt;
    ws.send(tokio_tungstenite::tungstenite::Message::Text(text.to_string().into()))
        .await
        .expect("Failed to send frame");
}
