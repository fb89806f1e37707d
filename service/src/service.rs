//! The consistency core: show operations across both stores.

use showgrid_core::{
    CalendarError, CalendarStore, ChangeEvent, Event, EventBus, EventRecord, EventSelector,
    Include, NewEvent, SerializedEvent, Show, ShowCatalog, ShowRecord, ShowStore, ShowTransaction,
    StoreError,
};
use std::sync::Arc;

use crate::error::{Result, ServiceError};
use crate::mapper::Mapper;
use crate::requests::{
    CountRequest, CountResponse, CreateRequest, CreateResponse, DeleteRequest, DeleteResponse,
    GetRequest, GetResponse, ListRequest, ListResponse, UpdateRequest, UpdateResponse,
};

/// The topic change events are published on.
pub const EVENTS_TOPIC: &str = "events";

/// Service managing shows across the relational and calendar stores.
///
/// One invocation handles one logical request; the transaction handle an
/// operation opens is exclusively owned by that invocation. The service is
/// safe to invoke concurrently for different lookup keys; cross-row
/// consistency is delegated to the relational store's transaction isolation,
/// not to in-process locking.
pub struct ShowService {
    store: Arc<dyn ShowStore>,
    calendar: Arc<dyn CalendarStore>,
    bus: Arc<dyn EventBus>,
}

impl ShowService {
    /// Create a service over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn ShowStore>,
        calendar: Arc<dyn CalendarStore>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            store,
            calendar,
            bus,
        }
    }

    fn mapper(&self) -> Mapper<'_> {
        Mapper::new(self.calendar.as_ref())
    }

    /// Serialize once and publish, fire-and-forget.
    ///
    /// The state change backing `change` has already committed, so a bus
    /// failure here must not fail the operation; it is logged and dropped.
    async fn publish(&self, change: ChangeEvent) {
        let serialized = match SerializedEvent::from_change(&change) {
            Ok(serialized) => serialized,
            Err(err) => {
                tracing::error!(
                    event_type = change.event_type(),
                    error = %err,
                    "failed to serialize change event"
                );
                return;
            }
        };

        if let Err(err) = self.bus.publish(EVENTS_TOPIC, &serialized).await {
            tracing::warn!(
                event_type = %serialized.event_type,
                error = %err,
                "failed to publish change event"
            );
        }
    }

    async fn rollback_logged(tx: Box<dyn ShowTransaction>) {
        if let Err(err) = tx.rollback().await {
            tracing::warn!(error = %err, "transaction rollback failed");
        }
    }

    /// Count shows.
    ///
    /// # Errors
    ///
    /// Returns the reclassified store error if the query fails.
    pub async fn count(&self, request: CountRequest) -> Result<CountResponse> {
        let count = self
            .store
            .count_shows(request.filter)
            .await
            .map_err(ServiceError::from)?;
        Ok(CountResponse { count })
    }

    /// List shows, mapping every returned record.
    ///
    /// # Errors
    ///
    /// Returns the reclassified store or calendar error; no partial results
    /// are returned on error.
    pub async fn list(&self, request: ListRequest) -> Result<ListResponse> {
        let records = self
            .store
            .find_shows(request.query)
            .await
            .map_err(ServiceError::from)?;

        let mapper = self.mapper();
        let mut shows = Vec::with_capacity(records.len());
        for record in records {
            shows.push(mapper.map_show(record).await?);
        }

        Ok(ListResponse { shows })
    }

    /// Get one show by id. A missing show is `None`, not an error.
    ///
    /// # Errors
    ///
    /// Returns the reclassified store or calendar error.
    pub async fn get(&self, request: GetRequest) -> Result<GetResponse> {
        let record = self
            .store
            .find_show(&request.id, request.include)
            .await
            .map_err(ServiceError::from)?;

        let Some(record) = record else {
            return Ok(GetResponse { show: None });
        };

        let show = self.mapper().map_show(record).await?;
        Ok(GetResponse { show: Some(show) })
    }

    /// Create a show and publish `ShowCreated`.
    ///
    /// A single-row insert needs no transaction, since there is nothing yet
    /// to reconcile, and no calendar interaction: events are created
    /// separately through the time-service boundary.
    ///
    /// # Errors
    ///
    /// Returns the reclassified store or calendar error.
    pub async fn create(&self, request: CreateRequest) -> Result<CreateResponse> {
        let record = self
            .store
            .create_show(request.data, request.include)
            .await
            .map_err(ServiceError::from)?;

        let show = self.mapper().map_show(record).await?;

        self.publish(ChangeEvent::ShowCreated {
            show: show.clone(),
        })
        .await;

        metrics::counter!("shows.created").increment(1);
        tracing::info!(show_id = %show.id, "show created");

        Ok(CreateResponse { show })
    }

    /// Update a show, reconciling owned events when the id changes, and
    /// publish `ShowUpdated` plus one `EventUpdated` per affected row.
    ///
    /// The read-update-reconcile sequence runs on a single transaction
    /// handle; a failure at any step rolls the whole transaction back, so
    /// readers never observe a partial id change. Mapping and publishing
    /// happen strictly after commit.
    ///
    /// # Errors
    ///
    /// Returns the reclassified store or calendar error. A missing show is
    /// an empty response, not an error, and produces no side effects.
    pub async fn update(&self, request: UpdateRequest) -> Result<UpdateResponse> {
        let UpdateRequest { id, data, include } = request;

        let tx = self.store.begin().await.map_err(ServiceError::from)?;

        let outcome: std::result::Result<Option<(ShowRecord, Vec<EventRecord>)>, StoreError> =
            async {
                let Some(old) = tx.find_show(&id, Include::none()).await? else {
                    return Ok(None);
                };
                let Some(new) = tx.update_show(&id, data, include).await? else {
                    return Ok(None);
                };
                let affected = reassign_events(&*tx, &old, &new).await?;
                Ok(Some((new, affected)))
            }
            .await;

        match outcome {
            Ok(Some((record, affected))) => {
                tx.commit().await.map_err(ServiceError::from)?;

                let mapper = self.mapper();
                let show = mapper.map_show(record).await?;
                self.publish(ChangeEvent::ShowUpdated {
                    show: show.clone(),
                })
                .await;

                let reassigned = affected.len();
                for record in affected {
                    let event = mapper.map_event(record).await?;
                    self.publish(ChangeEvent::EventUpdated { event }).await;
                }

                metrics::counter!("shows.updated").increment(1);
                tracing::info!(show_id = %show.id, reassigned, "show updated");

                Ok(UpdateResponse { show: Some(show) })
            }
            Ok(None) => {
                tx.rollback().await.map_err(ServiceError::from)?;
                Ok(UpdateResponse { show: None })
            }
            Err(err) => {
                Self::rollback_logged(tx).await;
                Err(err.into())
            }
        }
    }

    /// Delete a show and its events, publish `ShowDeleted` plus one
    /// `EventDeleted` per deleted row, then clean up calendar entries.
    ///
    /// The relational transaction covers the show row and the event-row
    /// cascade. Calendar cleanup targets a different store and runs after
    /// commit and after publishing: a cleanup failure surfaces as
    /// [`ServiceError::CalendarStore`] while the committed deletion and the
    /// already-published events remain valid. A crash between commit and
    /// cleanup leaves orphaned calendar entries; this is an accepted
    /// limitation.
    ///
    /// # Errors
    ///
    /// Returns the reclassified store or calendar error. A missing show is
    /// an empty response, not an error, and produces no side effects.
    pub async fn delete(&self, request: DeleteRequest) -> Result<DeleteResponse> {
        let DeleteRequest { id, include } = request;

        let tx = self.store.begin().await.map_err(ServiceError::from)?;
        let mapper = self.mapper();

        let outcome: Result<Option<(Show, Vec<Event>)>> = async {
            let deleted = tx
                .delete_show(&id, include)
                .await
                .map_err(ServiceError::from)?;
            let Some(record) = deleted else {
                return Ok(None);
            };

            let show = mapper.map_show(record).await?;

            let event_records = tx
                .find_events(EventSelector::OwnedBy(show.id.clone()))
                .await
                .map_err(ServiceError::from)?;
            let ids: Vec<String> = event_records.iter().map(|e| e.id.clone()).collect();
            tx.delete_events(ids).await.map_err(ServiceError::from)?;

            // Calendar entries still exist here; the deleted events must be
            // mapped before cleanup removes their time payloads.
            let mut events = Vec::with_capacity(event_records.len());
            for record in event_records {
                events.push(mapper.map_event(record).await?);
            }

            Ok(Some((show, events)))
        }
        .await;

        match outcome {
            Ok(Some((show, events))) => {
                tx.commit().await.map_err(ServiceError::from)?;

                self.publish(ChangeEvent::ShowDeleted {
                    show: show.clone(),
                })
                .await;
                for event in &events {
                    self.publish(ChangeEvent::EventDeleted {
                        event: event.clone(),
                    })
                    .await;
                }

                metrics::counter!("shows.deleted").increment(1);
                tracing::info!(show_id = %show.id, events = events.len(), "show deleted");

                self.cleanup_calendar(&events).await?;

                Ok(DeleteResponse { show: Some(show) })
            }
            Ok(None) => {
                tx.rollback().await.map_err(ServiceError::from)?;
                Ok(DeleteResponse { show: None })
            }
            Err(err) => {
                Self::rollback_logged(tx).await;
                Err(err)
            }
        }
    }

    /// Best-effort calendar cleanup after a committed delete.
    async fn cleanup_calendar(&self, events: &[Event]) -> Result<()> {
        for event in events {
            match self.calendar.delete_entry(&event.id).await {
                Ok(()) => {}
                Err(CalendarError::Data(reason)) => {
                    tracing::debug!(event_id = %event.id, reason, "calendar entry already gone");
                }
                Err(CalendarError::Service(reason)) => {
                    metrics::counter!("shows.calendar_cleanup_failed").increment(1);
                    tracing::error!(
                        event_id = %event.id,
                        reason = %reason,
                        "calendar cleanup failed after committed delete; entry orphaned"
                    );
                    return Err(ServiceError::CalendarStore(reason));
                }
            }
        }
        Ok(())
    }
}

/// Rewrite the show association on every event owned by `old` when the show
/// id changed.
///
/// The store offers no atomic multi-row foreign-reference rewrite with id
/// reuse guarantees, so the rows are deleted and re-inserted with identical
/// ids and kinds but the new show id, then re-read for their canonical
/// post-insert representations. All four steps run on the one open
/// transaction handle: a crash mid-sequence leaves either all-old or all-new
/// associations, never a partial set.
async fn reassign_events<C>(
    tx: &C,
    old: &ShowRecord,
    new: &ShowRecord,
) -> std::result::Result<Vec<EventRecord>, StoreError>
where
    C: ShowCatalog + ?Sized,
{
    if new.id == old.id {
        return Ok(Vec::new());
    }

    let events = tx
        .find_events(EventSelector::OwnedBy(old.id.clone()))
        .await?;
    if events.is_empty() {
        return Ok(events);
    }

    let ids: Vec<String> = events.iter().map(|event| event.id.clone()).collect();
    tx.delete_events(ids.clone()).await?;

    let rows = events
        .iter()
        .map(|event| NewEvent {
            id: event.id.clone(),
            show_id: Some(new.id.clone()),
            kind: event.kind,
        })
        .collect();
    tx.create_events(rows).await?;

    tx.find_events(EventSelector::Ids(ids)).await
}
