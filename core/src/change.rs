//! Outbound change notifications and their JSON wire format.
//!
//! Every logically committed state change is observable as exactly one
//! [`ChangeEvent`] on the bus. The union is a closed variant set with an
//! explicit `type` discriminator; the payload sits under a variant-specific
//! key inside `data`:
//!
//! ```json
//! {"type": "ShowCreated", "data": {"show": {"id": "s1", "title": "Morning Show"}}}
//! {"type": "EventDeleted", "data": {"event": {"id": "e1", ...}}}
//! ```
//!
//! Change events are immutable and serialized once, into a
//! [`SerializedEvent`], before publishing.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::{Event, Show};

/// Errors that can occur while serializing or parsing change events.
#[derive(Error, Debug)]
pub enum ChangeEventError {
    /// Failed to serialize a change event to JSON.
    #[error("failed to serialize change event: {0}")]
    Serialization(String),

    /// Failed to parse a change event from JSON.
    #[error("failed to parse change event: {0}")]
    Parse(String),
}

/// A committed state change, as observed by subscribers.
///
/// `EventCreated` is reserved for the time-service boundary that creates
/// events; show-level operations never emit it. Event creation is only
/// observable as a side effect of a show-id change, which re-announces the
/// affected rows as `EventUpdated`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChangeEvent {
    /// A show was created.
    ShowCreated {
        /// The show as committed.
        show: Show,
    },
    /// A show was updated.
    ShowUpdated {
        /// The show as committed.
        show: Show,
    },
    /// A show was deleted, together with its events.
    ShowDeleted {
        /// The show as it was at deletion time.
        show: Show,
    },
    /// An event was created. Reserved; not emitted by show operations.
    EventCreated {
        /// The event as committed.
        event: Event,
    },
    /// An event was updated (including show-id reassignment).
    EventUpdated {
        /// The event as committed.
        event: Event,
    },
    /// An event was deleted.
    EventDeleted {
        /// The event as it was at deletion time.
        event: Event,
    },
}

impl ChangeEvent {
    /// The wire discriminator for this variant.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::ShowCreated { .. } => "ShowCreated",
            Self::ShowUpdated { .. } => "ShowUpdated",
            Self::ShowDeleted { .. } => "ShowDeleted",
            Self::EventCreated { .. } => "EventCreated",
            Self::EventUpdated { .. } => "EventUpdated",
            Self::EventDeleted { .. } => "EventDeleted",
        }
    }

    /// Serialize to the JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeEventError::Serialization`] if JSON encoding fails.
    pub fn to_json(&self) -> Result<String, ChangeEventError> {
        serde_json::to_string(self).map_err(|e| ChangeEventError::Serialization(e.to_string()))
    }

    /// Parse from the JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeEventError::Parse`] if the JSON is malformed or the
    /// discriminator is unknown.
    pub fn from_json(json: &str) -> Result<Self, ChangeEventError> {
        serde_json::from_str(json).map_err(|e| ChangeEventError::Parse(e.to_string()))
    }
}

/// A change event serialized once, ready for the bus.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedEvent {
    /// The wire discriminator (e.g. `"ShowCreated"`).
    pub event_type: String,
    /// The full JSON wire form, including the discriminator.
    pub payload: String,
}

impl SerializedEvent {
    /// Create a serialized event from raw parts.
    #[must_use]
    pub const fn new(event_type: String, payload: String) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    /// Serialize a change event.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeEventError::Serialization`] if JSON encoding fails.
    pub fn from_change(change: &ChangeEvent) -> Result<Self, ChangeEventError> {
        Ok(Self {
            event_type: change.event_type().to_string(),
            payload: change.to_json()?,
        })
    }

    /// Parse the payload back into a change event.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeEventError::Parse`] if the payload is malformed.
    pub fn parse(&self) -> Result<ChangeEvent, ChangeEventError> {
        ChangeEvent::from_json(&self.payload)
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.payload.len()
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn show(id: &str) -> Show {
        Show {
            id: id.to_string(),
            title: "Morning Show".to_string(),
            description: None,
            events: None,
        }
    }

    #[test]
    fn wire_shape_uses_type_discriminator_and_variant_key() {
        let change = ChangeEvent::ShowCreated { show: show("s1") };
        let json = change.to_json().expect("serialization should succeed");

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "ShowCreated");
        assert_eq!(value["data"]["show"]["id"], "s1");
        assert!(value["data"].get("event").is_none());
    }

    #[test]
    fn parse_round_of_a_published_payload() {
        let change = ChangeEvent::ShowDeleted { show: show("s1") };
        let serialized = SerializedEvent::from_change(&change).unwrap();

        assert_eq!(serialized.event_type, "ShowDeleted");
        assert_eq!(serialized.parse().unwrap(), change);
    }

    #[test]
    fn unknown_discriminator_is_a_parse_error() {
        let err = ChangeEvent::from_json(r#"{"type":"ShowRenamed","data":{}}"#);
        assert!(matches!(err, Err(ChangeEventError::Parse(_))));
    }

    #[test]
    fn serialized_event_display() {
        let serialized = SerializedEvent::new("ShowCreated".to_string(), "{}".to_string());
        let display = format!("{serialized}");
        assert!(display.contains("ShowCreated"));
        assert!(display.contains("2 bytes"));
    }
}
