use crate::monitor::{describe_state_change, log_state_change};

use serde_json::json;

#[test]
fn given_state_transition_when_described_then_old_and_new_shown() {
    let data = json!({
        "entity_id": "light.kitchen",
        "old_state": { "entity_id": "light.kitchen", "state": "off" },
        "new_state": { "entity_id": "light.kitchen", "state": "on" }
    });

    assert_eq!(
        describe_state_change(&data).as_deref(),
        Some("light.kitchen: off -> on")
    );
}

#[test]
fn given_new_or_removed_entity_when_described_then_lifecycle_shown() {
    let added = json!({ "entity_id": "sensor.new", "old_state": null, "new_state": { "state": "12" } });
    let removed = json!({ "entity_id": "sensor.old", "old_state": { "state": "3" }, "new_state": null });

    assert_eq!(
        describe_state_change(&added).as_deref(),
        Some("sensor.new: added as 12")
    );
    assert_eq!(
        describe_state_change(&removed).as_deref(),
        Some("sensor.old: removed")
    );
}

#[test]
fn given_data_without_entity_id_when_described_then_none() {
    assert_eq!(describe_state_change(&json!({ "new_state": { "state": "on" } })), None);
}

/// **VALUE**: The logging handler reports malformed events as handler errors,
/// which the client logs and moves past.
#[tokio::test]
async fn given_malformed_event_when_handled_then_error_returned() {
    assert!(log_state_change(json!({})).await.is_err());
    assert!(
        log_state_change(json!({ "entity_id": "light.a", "new_state": { "state": "on" } }))
            .await
            .is_ok()
    );
}
