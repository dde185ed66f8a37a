//! What the monitor does with hub events.

use hass_client::HandlerResult;

use log::info;
use serde_json::Value;

/// One-line summary of a `state_changed` event's data, e.g.
/// `light.kitchen: off -> on`.
///
/// Returns `None` if the data carries no `entity_id`.
pub fn describe_state_change(data: &Value) -> Option<String> {
    let entity_id = data.get("entity_id")?.as_str()?;

    let state_of = |key: &str| {
        data.get(key)
            .and_then(|s| s.get("state"))
            .and_then(Value::as_str)
    };

    let line = match (state_of("old_state"), state_of("new_state")) {
        (Some(old), Some(new)) => format!("{entity_id}: {old} -> {new}"),
        (None, Some(new)) => format!("{entity_id}: added as {new}"),
        (_, None) => format!("{entity_id}: removed"),
    };

    Some(line)
}

/// `state_changed` handler that logs each change.
pub async fn log_state_change(data: Value) -> HandlerResult {
    let line = describe_state_change(&data).ok_or("state_changed event without entity_id")?;
    info!("{line}");
    Ok(())
}
