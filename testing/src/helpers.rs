//! Sample data and subscription assertion helpers.

use chrono::{TimeZone, Utc};
use futures::StreamExt;
use showgrid_core::{CalendarEntry, ChangeEvent, EventStream};
use std::time::Duration;

/// A fixed calendar entry for the given event id.
///
/// All sample entries share the same two-hour slot so tests stay
/// deterministic.
#[must_use]
pub fn sample_entry(id: &str) -> CalendarEntry {
    CalendarEntry {
        id: id.to_string(),
        start: Utc
            .with_ymd_and_hms(2025, 6, 1, 8, 0, 0)
            .single()
            .unwrap_or_default(),
        end: Utc
            .with_ymd_and_hms(2025, 6, 1, 10, 0, 0)
            .single()
            .unwrap_or_default(),
        timezone: "Europe/Warsaw".to_string(),
        recurrence: None,
    }
}

/// Read exactly `n` change events from a subscription, parsing each payload.
///
/// # Panics
///
/// Panics if the stream ends early, an item does not arrive within one
/// second, an in-band bus error is observed, or a payload fails to parse.
/// All of these are test failures.
#[allow(clippy::expect_used, clippy::panic)]
pub async fn take_changes(stream: &mut EventStream, n: usize) -> Vec<ChangeEvent> {
    let mut changes = Vec::with_capacity(n);
    for _ in 0..n {
        let item = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("timed out waiting for a change event")
            .expect("subscription ended early");
        let event = match item {
            Ok(event) => event,
            Err(err) => panic!("unexpected bus error: {err}"),
        };
        changes.push(event.parse().expect("published payload should parse"));
    }
    changes
}
