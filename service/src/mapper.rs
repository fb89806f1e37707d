//! Domain mapper: merges relational rows with calendar entries.
//!
//! Mapping is purely read-only against the calendar store. A show nested
//! inside an event is mapped without re-expanding its event list, so the
//! recursion is bounded by construction.

use showgrid_core::{CalendarStore, Event, EventRecord, Show, ShowRecord};
use std::future::Future;
use std::pin::Pin;

use crate::error::{Result, ServiceError};

/// Maps raw relational records to fully-resolved domain views.
pub struct Mapper<'a> {
    calendar: &'a dyn CalendarStore,
}

impl<'a> Mapper<'a> {
    /// Create a mapper reading from the given calendar store.
    #[must_use]
    pub const fn new(calendar: &'a dyn CalendarStore) -> Self {
        Self { calendar }
    }

    /// Map an event row, resolving its calendar entry by id.
    ///
    /// If the row carries its owning show, that show is mapped too, with
    /// its event list left unset, since the store never includes events on a
    /// nested show.
    ///
    /// # Errors
    ///
    /// Calendar failures are reclassified per the service taxonomy:
    /// a missing or malformed entry becomes [`ServiceError::Validation`],
    /// an infrastructure failure becomes [`ServiceError::CalendarStore`].
    pub fn map_event(
        &self,
        record: EventRecord,
    ) -> Pin<Box<dyn Future<Output = Result<Event>> + Send + '_>> {
        Box::pin(async move {
            let entry = self
                .calendar
                .get_entry(&record.id)
                .await
                .map_err(ServiceError::from)?;

            let show = match record.show.clone() {
                Some(show_record) => Some(self.map_show(show_record).await?),
                None => None,
            };

            Ok(Event::merge(record, entry, show))
        })
    }

    /// Map a show row.
    ///
    /// The event list is mapped only when the store returned one, keeping
    /// the "not requested" / "empty" distinction intact.
    ///
    /// # Errors
    ///
    /// Propagates [`Mapper::map_event`] failures for contained events.
    pub async fn map_show(&self, mut record: ShowRecord) -> Result<Show> {
        let events = match record.events.take() {
            Some(records) => {
                let mut mapped = Vec::with_capacity(records.len());
                for event in records {
                    mapped.push(self.map_event(event).await?);
                }
                Some(mapped)
            }
            None => None,
        };

        Ok(Show::from_record(record, events))
    }
}
