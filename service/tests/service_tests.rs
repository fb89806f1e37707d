//! End-to-end tests for the consistency core over in-memory stores and the
//! broadcast bus.
//!
//! Every test subscribes to the events topic before acting, so the observed
//! change events are exactly those produced by the operation under test.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use futures::StreamExt;
use showgrid_channels::BroadcastChannels;
use showgrid_core::{
    CalendarError, ChangeEvent, EventBus, EventKind, EventStream, Include, NewShow, ShowFilter,
    ShowPatch, StoreError,
};
use showgrid_service::{
    CountRequest, CreateRequest, DeleteRequest, GetRequest, ListRequest, ServiceError,
    ShowService, UpdateRequest, Watcher,
};
use showgrid_testing::{
    CalendarOp, MemoryCalendarStore, MemoryShowStore, StoreOp, sample_entry, take_changes,
};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    store: Arc<MemoryShowStore>,
    calendar: Arc<MemoryCalendarStore>,
    bus: Arc<BroadcastChannels>,
    service: ShowService,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryShowStore::new());
    let calendar = Arc::new(MemoryCalendarStore::new());
    let bus = Arc::new(BroadcastChannels::default());
    let service = ShowService::new(store.clone(), calendar.clone(), bus.clone());
    Harness {
        store,
        calendar,
        bus,
        service,
    }
}

impl Harness {
    async fn subscribe(&self) -> EventStream {
        self.bus.subscribe(&["events"]).await.expect("subscribe")
    }

    fn seed_show_with_events(&self, show_id: &str, event_ids: &[&str]) {
        self.store.insert_show(show_id, "Morning Show");
        for id in event_ids {
            self.store.insert_event(id, Some(show_id), EventKind::Live);
            self.calendar.insert(sample_entry(id));
        }
    }
}

async fn assert_no_pending(stream: &mut EventStream) {
    let pending = tokio::time::timeout(Duration::from_millis(100), stream.next()).await;
    assert!(pending.is_err(), "expected no further events, got {pending:?}");
}

fn update_id_request(id: &str, new_id: &str) -> UpdateRequest {
    UpdateRequest {
        id: id.to_string(),
        data: ShowPatch {
            id: Some(new_id.to_string()),
            ..ShowPatch::default()
        },
        include: Include::none(),
    }
}

#[tokio::test]
async fn create_returns_mapped_show_and_emits_show_created() {
    let h = harness();
    let mut stream = h.subscribe().await;

    let response = h
        .service
        .create(CreateRequest {
            data: NewShow {
                id: Some("s1".to_string()),
                title: "Morning Show".to_string(),
                description: None,
            },
            include: Include::none(),
        })
        .await
        .unwrap();

    assert_eq!(response.show.id, "s1");
    assert_eq!(response.show.title, "Morning Show");
    assert!(response.show.events.is_none());

    let changes = take_changes(&mut stream, 1).await;
    match &changes[0] {
        ChangeEvent::ShowCreated { show } => assert_eq!(show.id, "s1"),
        other => panic!("expected ShowCreated, got {other:?}"),
    }
    assert_no_pending(&mut stream).await;
}

#[tokio::test]
async fn same_id_update_emits_one_show_updated_and_no_event_updates() {
    let h = harness();
    h.seed_show_with_events("s1", &["e1", "e2"]);
    let mut stream = h.subscribe().await;

    let response = h
        .service
        .update(UpdateRequest {
            id: "s1".to_string(),
            data: ShowPatch {
                title: Some("Late Show".to_string()),
                ..ShowPatch::default()
            },
            include: Include::none(),
        })
        .await
        .unwrap();

    assert_eq!(response.show.as_ref().map(|s| s.title.as_str()), Some("Late Show"));

    let changes = take_changes(&mut stream, 1).await;
    assert!(matches!(&changes[0], ChangeEvent::ShowUpdated { show } if show.id == "s1"));
    assert_no_pending(&mut stream).await;
}

#[tokio::test]
async fn id_change_reassigns_events_and_emits_show_then_events_in_order() {
    let h = harness();
    h.seed_show_with_events("s1", &["e1", "e2"]);
    let mut stream = h.subscribe().await;

    let response = h.service.update(update_id_request("s1", "s2")).await.unwrap();
    assert_eq!(response.show.map(|s| s.id), Some("s2".to_string()));

    // Every owned row now references the new id.
    for row in h.store.event_rows() {
        assert_eq!(row.show_id.as_deref(), Some("s2"));
    }

    let changes = take_changes(&mut stream, 3).await;
    assert!(matches!(&changes[0], ChangeEvent::ShowUpdated { show } if show.id == "s2"));
    match (&changes[1], &changes[2]) {
        (
            ChangeEvent::EventUpdated { event: first },
            ChangeEvent::EventUpdated { event: second },
        ) => {
            assert_eq!(first.id, "e1");
            assert_eq!(second.id, "e2");
            assert_eq!(first.show_id.as_deref(), Some("s2"));
            assert_eq!(second.show_id.as_deref(), Some("s2"));
        }
        other => panic!("expected two EventUpdated, got {other:?}"),
    }
    assert_no_pending(&mut stream).await;
}

#[tokio::test]
async fn id_change_with_no_events_emits_only_show_updated() {
    let h = harness();
    h.store.insert_show("s1", "Morning Show");
    let mut stream = h.subscribe().await;

    h.service.update(update_id_request("s1", "s2")).await.unwrap();

    let changes = take_changes(&mut stream, 1).await;
    assert!(matches!(&changes[0], ChangeEvent::ShowUpdated { .. }));
    assert_no_pending(&mut stream).await;
}

#[tokio::test]
async fn update_on_missing_show_is_empty_with_no_side_effects() {
    let h = harness();
    let mut stream = h.subscribe().await;

    let response = h.service.update(update_id_request("ghost", "s2")).await.unwrap();
    assert!(response.show.is_none());
    assert!(h.store.show_ids().is_empty());
    assert_no_pending(&mut stream).await;
}

#[tokio::test]
async fn reinsert_failure_rolls_back_show_and_event_rows() {
    let h = harness();
    h.seed_show_with_events("s1", &["e1", "e2"]);
    let mut stream = h.subscribe().await;

    h.store.fail_next(
        StoreOp::CreateEvents,
        StoreError::Service("write failed".to_string()),
    );

    let err = h.service.update(update_id_request("s1", "s2")).await;
    assert!(matches!(err, Err(ServiceError::ShowStore(_))));

    // Both stores look exactly as they did before the operation started.
    assert_eq!(h.store.show_ids(), vec!["s1".to_string()]);
    let rows = h.store.event_rows();
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(row.show_id.as_deref(), Some("s1"));
    }
    assert_no_pending(&mut stream).await;
}

#[tokio::test]
async fn delete_cascades_rows_and_emits_show_then_events_in_order() {
    let h = harness();
    h.seed_show_with_events("s1", &["e1", "e2"]);
    let mut stream = h.subscribe().await;

    let response = h
        .service
        .delete(DeleteRequest {
            id: "s1".to_string(),
            include: Include::none(),
        })
        .await
        .unwrap();

    assert_eq!(response.show.map(|s| s.id), Some("s1".to_string()));
    assert!(h.store.show_ids().is_empty());
    assert!(h.store.event_rows().is_empty());
    assert_eq!(
        h.calendar.deleted_ids(),
        vec!["e1".to_string(), "e2".to_string()]
    );

    let changes = take_changes(&mut stream, 3).await;
    assert!(matches!(&changes[0], ChangeEvent::ShowDeleted { show } if show.id == "s1"));
    assert!(matches!(&changes[1], ChangeEvent::EventDeleted { event } if event.id == "e1"));
    assert!(matches!(&changes[2], ChangeEvent::EventDeleted { event } if event.id == "e2"));
    assert_no_pending(&mut stream).await;
}

#[tokio::test]
async fn delete_on_missing_show_is_empty_with_no_side_effects() {
    let h = harness();
    h.seed_show_with_events("s1", &["e1"]);
    let mut stream = h.subscribe().await;

    let response = h
        .service
        .delete(DeleteRequest {
            id: "ghost".to_string(),
            include: Include::none(),
        })
        .await
        .unwrap();

    assert!(response.show.is_none());
    assert_eq!(h.store.show_ids(), vec!["s1".to_string()]);
    assert!(h.calendar.deleted_ids().is_empty());
    assert_no_pending(&mut stream).await;
}

#[tokio::test]
async fn calendar_cleanup_failure_surfaces_but_committed_delete_stands() {
    let h = harness();
    h.seed_show_with_events("s1", &["e1", "e2"]);
    let mut stream = h.subscribe().await;

    h.calendar.fail_next(
        CalendarOp::DeleteEntry,
        CalendarError::Service("calendar down".to_string()),
    );

    let err = h
        .service
        .delete(DeleteRequest {
            id: "s1".to_string(),
            include: Include::none(),
        })
        .await;
    assert!(matches!(err, Err(ServiceError::CalendarStore(_))));

    // The relational deletion committed and its events were already
    // published; only the calendar entries are orphaned.
    assert!(h.store.show_ids().is_empty());
    assert!(h.store.event_rows().is_empty());

    let changes = take_changes(&mut stream, 3).await;
    assert!(matches!(&changes[0], ChangeEvent::ShowDeleted { .. }));
    assert!(matches!(&changes[1], ChangeEvent::EventDeleted { .. }));
    assert!(matches!(&changes[2], ChangeEvent::EventDeleted { .. }));
    assert_no_pending(&mut stream).await;
}

#[tokio::test]
async fn get_maps_included_events_with_calendar_payload() {
    let h = harness();
    h.seed_show_with_events("s1", &["e1"]);

    let response = h
        .service
        .get(GetRequest {
            id: "s1".to_string(),
            include: Include::events(),
        })
        .await
        .unwrap();

    let show = response.show.expect("show should exist");
    let events = show.events.expect("events were requested");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, "e1");
    assert_eq!(events[0].timezone, "Europe/Warsaw");
}

#[tokio::test]
async fn get_on_missing_show_is_none() {
    let h = harness();
    let response = h
        .service
        .get(GetRequest {
            id: "ghost".to_string(),
            include: Include::none(),
        })
        .await
        .unwrap();
    assert!(response.show.is_none());
}

#[tokio::test]
async fn missing_calendar_entry_is_a_validation_error() {
    let h = harness();
    h.store.insert_show("s1", "Morning Show");
    h.store.insert_event("e1", Some("s1"), EventKind::Live);
    // No calendar entry for e1.

    let err = h
        .service
        .get(GetRequest {
            id: "s1".to_string(),
            include: Include::events(),
        })
        .await;
    assert!(matches!(err, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn calendar_infrastructure_failure_is_a_calendar_store_error() {
    let h = harness();
    h.seed_show_with_events("s1", &["e1"]);
    h.calendar.fail_next(
        CalendarOp::GetEntry,
        CalendarError::Service("timeout".to_string()),
    );

    let err = h
        .service
        .get(GetRequest {
            id: "s1".to_string(),
            include: Include::events(),
        })
        .await;
    assert!(matches!(err, Err(ServiceError::CalendarStore(_))));
}

#[tokio::test]
async fn count_and_list_pass_arguments_through() {
    let h = harness();
    h.store.insert_show("s1", "Morning Show");
    h.store.insert_show("s2", "Evening Show");

    let count = h
        .service
        .count(CountRequest {
            filter: Some(ShowFilter {
                title: Some("Morning Show".to_string()),
            }),
        })
        .await
        .unwrap();
    assert_eq!(count.count, 1);

    let list = h.service.list(ListRequest::default()).await.unwrap();
    let ids: Vec<&str> = list.shows.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s2"]);
}

#[tokio::test]
async fn store_failure_on_read_is_reclassified() {
    let h = harness();
    h.store.fail_next(
        StoreOp::FindShows,
        StoreError::Service("connection reset".to_string()),
    );

    let err = h.service.list(ListRequest::default()).await;
    assert!(matches!(err, Err(ServiceError::ShowStore(_))));
}

#[tokio::test]
async fn watcher_yields_typed_changes() {
    let h = harness();
    let watcher = Watcher::new(h.bus.clone());
    let mut stream = watcher.subscribe().await.unwrap();

    h.service
        .create(CreateRequest {
            data: NewShow {
                id: Some("s1".to_string()),
                title: "Morning Show".to_string(),
                description: None,
            },
            include: Include::none(),
        })
        .await
        .unwrap();

    let change = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("change should arrive")
        .expect("stream open")
        .expect("payload should parse");
    assert!(matches!(change, ChangeEvent::ShowCreated { show } if show.id == "s1"));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // After an id-changing update every owned event row references the
        // new id, the row count is unchanged, and exactly one ShowUpdated
        // plus one EventUpdated per row is published.
        #[test]
        fn id_change_rewrites_every_owned_event(n in 0usize..10) {
            let rt = tokio::runtime::Runtime::new().expect("runtime");
            rt.block_on(async move {
                let h = harness();
                let event_ids: Vec<String> = (0..n).map(|i| format!("e{i}")).collect();
                let refs: Vec<&str> = event_ids.iter().map(String::as_str).collect();
                h.seed_show_with_events("s1", &refs);
                let mut stream = h.subscribe().await;

                h.service.update(update_id_request("s1", "s2")).await.unwrap();

                let rows = h.store.event_rows();
                assert_eq!(rows.len(), n);
                for row in rows {
                    assert_eq!(row.show_id.as_deref(), Some("s2"));
                }

                let changes = take_changes(&mut stream, n + 1).await;
                assert!(matches!(&changes[0], ChangeEvent::ShowUpdated { .. }));
                assert_eq!(
                    changes[1..]
                        .iter()
                        .filter(|c| matches!(c, ChangeEvent::EventUpdated { .. }))
                        .count(),
                    n
                );
                assert_no_pending(&mut stream).await;
            });
        }
    }
}
