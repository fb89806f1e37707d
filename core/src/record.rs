//! Raw store records and the plumbing types used by the store contracts.
//!
//! These types mirror what each backing store actually owns. The relational
//! store owns show/event identity and the show association; the calendar
//! store owns the time payload keyed by event id. Merged domain views live in
//! [`crate::domain`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error for parsing store-level enumerations from their string form.
#[derive(Error, Debug)]
#[error("invalid {what}: {value}")]
pub struct ParseKindError {
    /// What was being parsed.
    pub what: &'static str,
    /// The rejected input.
    pub value: String,
}

/// The kind of a scheduled event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Broadcast live from the studio.
    Live,
    /// Replay of a previous broadcast.
    Replay,
    /// Prerecorded material aired on schedule.
    Prerecorded,
}

impl EventKind {
    /// Stable string form, used as the database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Replay => "replay",
            Self::Prerecorded => "prerecorded",
        }
    }

    /// Parse the database representation.
    ///
    /// # Errors
    ///
    /// Returns [`ParseKindError`] if the string is not a known kind.
    pub fn parse(s: &str) -> Result<Self, ParseKindError> {
        match s {
            "live" => Ok(Self::Live),
            "replay" => Ok(Self::Replay),
            "prerecorded" => Ok(Self::Prerecorded),
            _ => Err(ParseKindError {
                what: "event kind",
                value: s.to_string(),
            }),
        }
    }
}

/// A show row as the relational store returns it.
///
/// `events` is `Some` only when the caller asked for the relation via
/// [`Include`]; `Some(vec![])` means "requested and empty", `None` means
/// "not requested". The distinction is carried through to the domain view.
#[derive(Clone, Debug, PartialEq)]
pub struct ShowRecord {
    /// Unique show id. Mutable through updates.
    pub id: String,
    /// Show title.
    pub title: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Owned events, present only when requested.
    pub events: Option<Vec<EventRecord>>,
}

/// An event row as the relational store returns it.
#[derive(Clone, Debug, PartialEq)]
pub struct EventRecord {
    /// Unique event id, shared with the calendar store's key space.
    pub id: String,
    /// Owning show id, if any.
    pub show_id: Option<String>,
    /// Event kind.
    pub kind: EventKind,
    /// Owning show row, present only when the query included it.
    pub show: Option<ShowRecord>,
}

/// Data for inserting a new show.
#[derive(Clone, Debug, Default)]
pub struct NewShow {
    /// Explicit id; the store generates one when absent.
    pub id: Option<String>,
    /// Show title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
}

/// Field-wise patch for updating a show. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default)]
pub struct ShowPatch {
    /// New id. Changing the id cascades to owned events (handled by the
    /// consistency core, not the store).
    pub id: Option<String>,
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
}

/// Data for inserting an event row.
#[derive(Clone, Debug)]
pub struct NewEvent {
    /// Event id, shared with the calendar store.
    pub id: String,
    /// Owning show id, if any.
    pub show_id: Option<String>,
    /// Event kind.
    pub kind: EventKind,
}

/// Which relations to load alongside a show row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Include {
    /// Load the show's owned events.
    pub events: bool,
}

impl Include {
    /// Include nothing beyond the row itself.
    #[must_use]
    pub const fn none() -> Self {
        Self { events: false }
    }

    /// Include the show's owned events.
    #[must_use]
    pub const fn events() -> Self {
        Self { events: true }
    }
}

/// Exact-match filter for show queries.
#[derive(Clone, Debug, Default)]
pub struct ShowFilter {
    /// Match shows with this exact title.
    pub title: Option<String>,
}

/// Ordering for show listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShowOrder {
    /// By title, ascending.
    TitleAsc,
    /// By title, descending.
    TitleDesc,
}

/// Arguments for listing shows.
#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    /// Row filter.
    pub filter: Option<ShowFilter>,
    /// Result ordering.
    pub order: Option<ShowOrder>,
    /// Maximum number of rows.
    pub limit: Option<u64>,
    /// Rows to skip.
    pub offset: Option<u64>,
    /// Relations to load.
    pub include: Include,
}

/// Selects event rows for reads and cascades.
#[derive(Clone, Debug)]
pub enum EventSelector {
    /// Events owned by the given show id.
    OwnedBy(String),
    /// Events with the given ids, returned in the given order where the
    /// store supports it.
    Ids(Vec<String>),
}

/// Recurrence frequency of a calendar entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Every day.
    Daily,
    /// Every week.
    Weekly,
    /// Every month.
    Monthly,
}

/// Recurrence rule attached to a calendar entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    /// How often the entry repeats.
    pub frequency: Frequency,
    /// Gap between occurrences, in units of `frequency`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    /// Total number of occurrences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Last instant an occurrence may start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
}

/// The time payload the calendar store holds for an event id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalendarEntry {
    /// Event id; same key space as the relational event rows.
    pub id: String,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_roundtrip() {
        for kind in [EventKind::Live, EventKind::Replay, EventKind::Prerecorded] {
            assert_eq!(EventKind::parse(kind.as_str()).ok(), Some(kind));
        }
    }

    #[test]
    fn event_kind_rejects_unknown() {
        let err = EventKind::parse("rerun");
        assert!(err.is_err());
    }

    #[test]
    fn include_defaults_to_nothing() {
        assert_eq!(Include::default(), Include::none());
        assert!(Include::events().events);
    }
}
