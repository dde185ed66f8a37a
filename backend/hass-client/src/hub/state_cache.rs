//! Last-known entity states.
//!
//! Seeded once from the bulk `get_states` reply and then kept current by the
//! `state_changed` handler. Both writers run on the receive loop; readers go
//! straight to the map and never wait on the socket.

use crate::error::HassError;

use std::collections::HashMap;

use dashmap::DashMap;
use log::{debug, warn};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The hub's view of one entity.
///
/// Fields the hub sends beyond the common ones land in `extra`, so the record
/// serializes back to what the hub reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    #[serde(default)]
    pub entity_id: String,
    #[serde(deserialize_with = "state_text")]
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_changed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accepts numeric and boolean states as their JSON text.
fn state_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        scalar @ (Value::Number(_) | Value::Bool(_)) => Ok(scalar.to_string()),
        other => Err(D::Error::custom(format!(
            "state must be a string, number or bool, got {other}"
        ))),
    }
}

impl EntityState {
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// `friendly_name` attribute, if the hub set one.
    pub fn friendly_name(&self) -> Option<&str> {
        self.attribute("friendly_name").and_then(Value::as_str)
    }
}

#[derive(Deserialize)]
struct StateChangedData {
    entity_id: String,
    #[serde(default)]
    new_state: Option<EntityState>,
}

#[derive(Default)]
pub(crate) struct StateCache {
    states: DashMap<String, EntityState>,
}

impl StateCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, entity_id: &str) -> Option<EntityState> {
        self.states.get(entity_id).map(|entry| entry.value().clone())
    }

    pub(crate) fn get_all(&self) -> HashMap<String, EntityState> {
        self.states
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Stores every record of a `get_states` result. Returns how many were stored.
    ///
    /// Records that do not decode are skipped.
    pub(crate) fn seed(&self, result: &Value) -> usize {
        let Some(records) = result.as_array() else {
            warn!("Bulk state result is not an array, cache left as is");
            return 0;
        };

        let mut stored = 0;
        for record in records {
            match EntityState::deserialize(record) {
                Ok(state) if !state.entity_id.is_empty() => {
                    self.states.insert(state.entity_id.clone(), state);
                    stored += 1;
                }
                Ok(_) => warn!("Skipping bulk state record without entity_id"),
                Err(e) => warn!("Skipping malformed bulk state record: {e}"),
            }
        }

        debug!("Seeded {stored} of {} entity states", records.len());
        stored
    }

    /// Applies the `data` of one `state_changed` event.
    ///
    /// A `null` `new_state` means the entity was removed on the hub.
    ///
    /// # Errors
    ///
    /// Returns [`HassError::Protocol`] if `data` lacks `entity_id` or carries a
    /// `new_state` that does not decode.
    pub(crate) fn apply_state_changed(&self, data: &Value) -> Result<(), HassError> {
        let changed = StateChangedData::deserialize(data)?;

        match changed.new_state {
            Some(mut state) => {
                if state.entity_id.is_empty() {
                    state.entity_id = changed.entity_id.clone();
                }
                self.states.insert(changed.entity_id, state);
            }
            None => {
                debug!("Entity {} removed", changed.entity_id);
                self.states.remove(&changed.entity_id);
            }
        }

        Ok(())
    }
}
