use crate::helpers::{WAIT, connected_client, recv_json, reply_ok, send_json};

use hass_client::HassError;
use hass_client::protocol::RequestBody;

use futures_util::StreamExt;
use serde_json::json;
use tokio::time::timeout;

// ============================================================================
// HassClient::call_service() / toggle()
// ============================================================================

/// **VALUE**: `toggle` sends a `call_service` frame targeting the entity and
/// resolves with the hub's result.
///
/// **WHY THIS MATTERS**: This is what a button press does. The frame shape must
/// match the hub's API exactly or the press silently does nothing.
#[tokio::test]
async fn given_connected_client_when_toggling_then_call_service_frame_sent_and_result_returned() {
    // GIVEN: A connected client (ids 1 and 2 used by the initial sync)
    let (client, mut ws) = connected_client(json!([])).await;

    // WHEN: Toggling light.a while the hub answers
    let (outcome, request) = tokio::join!(client.toggle("light.a"), async {
        let request = recv_json(&mut ws).await;
        reply_ok(&mut ws, 3, json!({ "context": { "id": "ctx-1" } })).await;
        request
    });

    // THEN: The frame is the homeassistant.toggle call with the next id
    assert_eq!(
        request,
        json!({
            "id": 3,
            "type": "call_service",
            "domain": "homeassistant",
            "service": "toggle",
            "service_data": { "entity_id": "light.a" }
        })
    );
    assert_eq!(
        outcome.expect("toggle should succeed"),
        json!({ "context": { "id": "ctx-1" } })
    );
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn given_service_without_entity_when_called_then_no_service_data_sent() {
    let (client, mut ws) = connected_client(json!([])).await;

    let (outcome, request) = tokio::join!(client.call_service("script", "goodnight", None), async {
        let request = recv_json(&mut ws).await;
        reply_ok(&mut ws, 3, serde_json::Value::Null).await;
        request
    });

    assert!(outcome.is_ok());
    assert_eq!(request["domain"], "script");
    assert!(request.get("service_data").is_none());
}

/// **VALUE**: `success: false` surfaces as `RequestFailure` with the hub's code,
/// and the connection stays up.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - A failed result is returned as `Ok`
/// - A failed request tears down the session
#[tokio::test]
async fn given_hub_rejecting_service_when_called_then_request_failure_and_still_connected() {
    // GIVEN: A connected client
    let (client, mut ws) = connected_client(json!([])).await;

    // WHEN: The hub fails the call
    let (outcome, _) = tokio::join!(client.call_service("light", "explode", Some("light.a")), async {
        let request = recv_json(&mut ws).await;
        send_json(
            &mut ws,
            json!({
                "id": request["id"],
                "type": "result",
                "success": false,
                "error": { "code": "not_found", "message": "Service light.explode not found." }
            }),
        )
        .await;
    });

    // THEN: RequestFailure, connection intact
    match outcome {
        Err(e @ HassError::RequestFailure { .. }) => {
            assert_eq!(e.request_id(), Some(3));
            assert!(!e.is_fatal());
            assert!(e.to_string().contains("not_found"));
        }
        other => panic!("Expected RequestFailure, got {other:?}"),
    }
    assert!(client.is_connected());
}

/// **VALUE**: A failure carrying an integer `code`, as older hubs send it, still
/// reaches the caller instead of leaving it waiting.
#[tokio::test]
async fn given_hub_failing_with_numeric_code_when_called_then_caller_gets_request_failure() {
    // GIVEN: A connected client
    let (client, mut ws) = connected_client(json!([])).await;

    // WHEN: The hub fails the call with code 3
    let (outcome, _) = tokio::join!(
        timeout(WAIT, client.toggle("light.missing")),
        async {
            let request = recv_json(&mut ws).await;
            send_json(
                &mut ws,
                json!({
                    "id": request["id"],
                    "type": "result",
                    "success": false,
                    "error": { "code": 3, "message": "Entity not found" }
                }),
            )
            .await;
        }
    );

    // THEN: RequestFailure with the code as text, nothing left pending
    match outcome.expect("caller must not be left waiting") {
        Err(HassError::RequestFailure { code, message, .. }) => {
            assert_eq!(code, "3");
            assert_eq!(message, "Entity not found");
        }
        other => panic!("Expected RequestFailure, got {other:?}"),
    }
    assert_eq!(client.pending_requests(), 0);
    assert!(client.is_connected());
}

// ============================================================================
// Correlation
// ============================================================================

/// **VALUE**: Replies answered out of order still reach the right caller.
///
/// **WHY THIS MATTERS**: The hub answers in completion order. A slow service call
/// must not receive the payload of a fast one sent after it.
#[tokio::test]
async fn given_two_requests_when_hub_answers_in_reverse_then_each_gets_its_own_result() {
    // GIVEN: Two requests in flight
    let (client, mut ws) = connected_client(json!([])).await;
    let first = client
        .request(RequestBody::call_service("light", "turn_on", Some("light.a")))
        .await
        .expect("sent");
    let second = client
        .request(RequestBody::call_service("light", "turn_on", Some("light.b")))
        .await
        .expect("sent");
    assert_eq!((first.id(), second.id()), (3, 4));

    let sent_first = recv_json(&mut ws).await;
    let sent_second = recv_json(&mut ws).await;
    assert_eq!(sent_first["service_data"]["entity_id"], "light.a");
    assert_eq!(sent_second["service_data"]["entity_id"], "light.b");

    // WHEN: The hub answers the second first
    reply_ok(&mut ws, 4, json!("b")).await;
    reply_ok(&mut ws, 3, json!("a")).await;

    // THEN: Each waiter gets its own payload
    assert_eq!(timeout(WAIT, first).await.unwrap().unwrap(), json!("a"));
    assert_eq!(timeout(WAIT, second).await.unwrap().unwrap(), json!("b"));
}

#[tokio::test]
async fn given_concurrent_callers_when_requests_sent_then_ids_strictly_increase_on_the_wire() {
    let (client, mut ws) = connected_client(json!([])).await;

    let (a, b, c) = tokio::join!(
        client.request(RequestBody::GetStates),
        client.request(RequestBody::GetStates),
        client.request(RequestBody::GetStates),
    );
    let _waiters = (a.unwrap(), b.unwrap(), c.unwrap());

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(recv_json(&mut ws).await["id"].as_u64().expect("numeric id"));
    }
    assert_eq!(ids, vec![3, 4, 5]);
}

// ============================================================================
// Teardown
// ============================================================================

/// **VALUE**: When the hub goes away, every outstanding request fails with
/// `ConnectionClosed` and later requests fail fast.
///
/// **WHY THIS MATTERS**: A button press during a hub restart must report an error,
/// not leave the caller awaiting forever.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The receive loop exits without draining the pending table
/// - Requests after teardown are written to a dead socket and never resolved
#[tokio::test]
async fn given_pending_requests_when_hub_closes_then_all_fail_and_later_requests_rejected() {
    // GIVEN: Two unanswered requests
    let (client, mut ws) = connected_client(json!([])).await;
    let waiters = vec![
        client.request(RequestBody::GetStates).await.expect("sent"),
        client
            .request(RequestBody::call_service("light", "turn_off", Some("light.a")))
            .await
            .expect("sent"),
    ];
    let _ = recv_json(&mut ws).await;
    let _ = recv_json(&mut ws).await;

    // WHEN: The hub closes the socket
    ws.close(None).await.expect("close frame sent");
    drop(ws);

    // THEN: Both fail with ConnectionClosed
    for waiter in waiters {
        let outcome = timeout(WAIT, waiter).await.expect("waiter must resolve");
        assert!(
            matches!(outcome, Err(HassError::ConnectionClosed { .. })),
            "Expected ConnectionClosed, got {outcome:?}"
        );
    }

    // THEN: The client reports the loss and refuses new work
    timeout(WAIT, client.closed()).await.expect("closed() must resolve");
    assert!(!client.is_connected());
    assert_eq!(client.pending_requests(), 0);

    let late = client.toggle("light.a").await;
    assert!(matches!(late, Err(HassError::ConnectionClosed { .. })));
}

#[tokio::test]
async fn given_connected_client_when_closed_locally_then_hub_sees_close_and_loop_stops() {
    let (client, mut ws) = connected_client(json!([])).await;

    client.close().await.expect("close frame sent");

    let saw_close = loop {
        match timeout(WAIT, ws.next()).await.expect("hub waiting for close") {
            Some(Ok(tokio_tungstenite::tungstenite::Message::Close(_))) => break true,
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => break false,
        }
    };
    assert!(saw_close, "Hub should receive a close frame");
    let _ = timeout(WAIT, async { while ws.next().await.is_some() {} }).await;

    timeout(WAIT, client.closed()).await.expect("closed() must resolve");
    assert!(!client.is_connected());
}
