//! Fully-resolved domain views.
//!
//! A domain [`Show`] or [`Event`] merges the relational row with its calendar
//! counterpart. The merge itself is performed by the domain mapper in
//! `showgrid-service`; this module only defines the merged shapes and the
//! constructors the mapper uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{CalendarEntry, EventKind, EventRecord, Recurrence, ShowRecord};

/// A broadcast program.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Show {
    /// Unique show id.
    pub id: String,
    /// Show title.
    pub title: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Owned events; `None` when the relation was not requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Event>>,
}

impl Show {
    /// Build a domain show from its relational row and already-mapped events.
    ///
    /// Passing `events: None` preserves the "relation not requested"
    /// distinction from the store.
    #[must_use]
    pub fn from_record(record: ShowRecord, events: Option<Vec<Event>>) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            events,
        }
    }
}

/// A scheduled occurrence of a show, with its calendar time payload resolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event id, shared with the calendar store.
    pub id: String,
    /// Event kind.
    pub kind: EventKind,
    /// Owning show id, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_id: Option<String>,
    /// Owning show view. Never carries a nested event list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show: Option<Box<Show>>,
    /// Start of the (first) occurrence.
    pub start: DateTime<Utc>,
    /// End of the (first) occurrence.
    pub end: DateTime<Utc>,
    /// IANA timezone the occurrence is anchored to.
    pub timezone: String,
    /// Recurrence rule, if the event repeats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
}

impl Event {
    /// Merge a relational event row with its calendar entry and an
    /// already-mapped owning show.
    #[must_use]
    pub fn merge(record: EventRecord, entry: CalendarEntry, show: Option<Show>) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            show_id: record.show_id,
            show: show.map(Box::new),
            start: entry.start,
            end: entry.end,
            timezone: entry.timezone,
            recurrence: entry.recurrence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str) -> CalendarEntry {
        CalendarEntry {
            id: id.to_string(),
            start: Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).single().unwrap_or_default(),
            end: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).single().unwrap_or_default(),
            timezone: "Europe/Warsaw".to_string(),
            recurrence: None,
        }
    }

    #[test]
    fn merge_takes_identity_from_the_row_and_time_from_the_entry() {
        let record = EventRecord {
            id: "e1".to_string(),
            show_id: Some("s1".to_string()),
            kind: EventKind::Live,
            show: None,
        };

        let event = Event::merge(record, entry("e1"), None);

        assert_eq!(event.id, "e1");
        assert_eq!(event.show_id.as_deref(), Some("s1"));
        assert_eq!(event.timezone, "Europe/Warsaw");
        assert!(event.show.is_none());
    }

    #[test]
    fn from_record_keeps_the_not_requested_distinction() {
        let record = ShowRecord {
            id: "s1".to_string(),
            title: "Morning Show".to_string(),
            description: None,
            events: None,
        };

        let without = Show::from_record(record.clone(), None);
        assert!(without.events.is_none());

        let with_empty = Show::from_record(record, Some(Vec::new()));
        assert_eq!(with_empty.events.as_deref(), Some(&[] as &[Event]));
    }
}
