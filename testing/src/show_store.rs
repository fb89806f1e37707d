//! In-memory relational show store with snapshot transactions.
//!
//! The store keeps rows in insertion order so tests are deterministic. A
//! transaction clones the shared state into a working copy; commit swaps the
//! working copy back in, rollback drops it. One-shot failures can be armed
//! per operation to drive rollback paths.

use showgrid_core::{
    EventKind, EventRecord, EventSelector, Include, ListQuery, NewEvent, NewShow, ShowCatalog,
    ShowFilter, ShowOrder, ShowPatch, ShowRecord, ShowStore, ShowTransaction, StoreError,
};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Operations a failure can be armed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// `count_shows`
    CountShows,
    /// `find_shows`
    FindShows,
    /// `find_show`
    FindShow,
    /// `create_show`
    CreateShow,
    /// `update_show`
    UpdateShow,
    /// `delete_show`
    DeleteShow,
    /// `find_events`
    FindEvents,
    /// `create_events`
    CreateEvents,
    /// `delete_events`
    DeleteEvents,
    /// `commit` on a transaction handle
    Commit,
}

#[derive(Clone, Debug)]
struct ShowRow {
    id: String,
    title: String,
    description: Option<String>,
}

#[derive(Clone, Debug)]
struct EventRow {
    id: String,
    show_id: Option<String>,
    kind: EventKind,
}

#[derive(Clone, Debug, Default)]
struct State {
    shows: Vec<ShowRow>,
    events: Vec<EventRow>,
}

type FailureMap = Arc<Mutex<HashMap<StoreOp, StoreError>>>;

fn take_failure(failures: &FailureMap, op: StoreOp) -> Result<(), StoreError> {
    let mut map = failures.lock().unwrap_or_else(PoisonError::into_inner);
    match map.remove(&op) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn event_record(row: &EventRow) -> EventRecord {
    EventRecord {
        id: row.id.clone(),
        show_id: row.show_id.clone(),
        kind: row.kind,
        show: None,
    }
}

fn show_record(state: &State, row: &ShowRow, include: Include) -> ShowRecord {
    let events = include.events.then(|| {
        state
            .events
            .iter()
            .filter(|e| e.show_id.as_deref() == Some(row.id.as_str()))
            .map(event_record)
            .collect()
    });
    ShowRecord {
        id: row.id.clone(),
        title: row.title.clone(),
        description: row.description.clone(),
        events,
    }
}

fn matches(row: &ShowRow, filter: Option<&ShowFilter>) -> bool {
    match filter.and_then(|f| f.title.as_deref()) {
        Some(title) => row.title == title,
        None => true,
    }
}

fn do_find_shows(state: &State, query: &ListQuery) -> Vec<ShowRecord> {
    let mut rows: Vec<&ShowRow> = state
        .shows
        .iter()
        .filter(|row| matches(row, query.filter.as_ref()))
        .collect();

    match query.order {
        Some(ShowOrder::TitleAsc) => rows.sort_by(|a, b| a.title.cmp(&b.title)),
        Some(ShowOrder::TitleDesc) => rows.sort_by(|a, b| b.title.cmp(&a.title)),
        None => {}
    }

    let offset = usize::try_from(query.offset.unwrap_or(0)).unwrap_or(usize::MAX);
    let limit = query
        .limit
        .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

    rows.into_iter()
        .skip(offset)
        .take(limit)
        .map(|row| show_record(state, row, query.include))
        .collect()
}

fn do_create_show(state: &mut State, data: NewShow, include: Include) -> Result<ShowRecord, StoreError> {
    let id = data.id.unwrap_or_else(|| Uuid::new_v4().to_string());
    if state.shows.iter().any(|row| row.id == id) {
        return Err(StoreError::Data(format!("show {id} already exists")));
    }
    let row = ShowRow {
        id,
        title: data.title,
        description: data.description,
    };
    let record = show_record(state, &row, include);
    state.shows.push(row);
    Ok(record)
}

fn do_update_show(
    state: &mut State,
    id: &str,
    patch: ShowPatch,
    include: Include,
) -> Result<Option<ShowRecord>, StoreError> {
    if let Some(new_id) = patch.id.as_deref() {
        if new_id != id && state.shows.iter().any(|row| row.id == new_id) {
            return Err(StoreError::Data(format!("show {new_id} already exists")));
        }
    }

    let Some(row) = state.shows.iter_mut().find(|row| row.id == id) else {
        return Ok(None);
    };
    if let Some(new_id) = patch.id {
        row.id = new_id;
    }
    if let Some(title) = patch.title {
        row.title = title;
    }
    if let Some(description) = patch.description {
        row.description = Some(description);
    }
    let row = row.clone();
    Ok(Some(show_record(state, &row, include)))
}

fn do_delete_show(state: &mut State, id: &str, include: Include) -> Option<ShowRecord> {
    let position = state.shows.iter().position(|row| row.id == id)?;
    let record = show_record(state, &state.shows[position], include);
    state.shows.remove(position);
    Some(record)
}

fn do_find_events(state: &State, selector: &EventSelector) -> Vec<EventRecord> {
    match selector {
        EventSelector::OwnedBy(show_id) => state
            .events
            .iter()
            .filter(|row| row.show_id.as_deref() == Some(show_id.as_str()))
            .map(event_record)
            .collect(),
        EventSelector::Ids(ids) => ids
            .iter()
            .filter_map(|id| state.events.iter().find(|row| &row.id == id))
            .map(event_record)
            .collect(),
    }
}

fn do_create_events(state: &mut State, rows: Vec<NewEvent>) -> Result<u64, StoreError> {
    for row in &rows {
        if state.events.iter().any(|e| e.id == row.id) {
            return Err(StoreError::Data(format!("event {} already exists", row.id)));
        }
    }
    let inserted = rows.len() as u64;
    state.events.extend(rows.into_iter().map(|row| EventRow {
        id: row.id,
        show_id: row.show_id,
        kind: row.kind,
    }));
    Ok(inserted)
}

fn do_delete_events(state: &mut State, ids: &[String]) -> u64 {
    let before = state.events.len();
    state.events.retain(|row| !ids.contains(&row.id));
    (before - state.events.len()) as u64
}

/// In-memory implementation of [`ShowStore`].
#[derive(Default)]
pub struct MemoryShowStore {
    state: Arc<Mutex<State>>,
    failures: FailureMap,
}

impl MemoryShowStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a show row directly, bypassing the contract.
    pub fn insert_show(&self, id: &str, title: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.shows.push(ShowRow {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
        });
    }

    /// Seed an event row directly, bypassing the contract.
    pub fn insert_event(&self, id: &str, show_id: Option<&str>, kind: EventKind) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.events.push(EventRow {
            id: id.to_string(),
            show_id: show_id.map(ToString::to_string),
            kind,
        });
    }

    /// Arm a one-shot failure for the next call to `op`, on this store or on
    /// any transaction opened from it.
    pub fn fail_next(&self, op: StoreOp, error: StoreError) {
        let mut map = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        map.insert(op, error);
    }

    /// Current show ids, in insertion order.
    #[must_use]
    pub fn show_ids(&self) -> Vec<String> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.shows.iter().map(|row| row.id.clone()).collect()
    }

    /// Current event rows, in insertion order.
    #[must_use]
    pub fn event_rows(&self) -> Vec<EventRecord> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.events.iter().map(event_record).collect()
    }
}

impl ShowCatalog for MemoryShowStore {
    fn count_shows(
        &self,
        filter: Option<ShowFilter>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::CountShows)?;
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(state
                .shows
                .iter()
                .filter(|row| matches(row, filter.as_ref()))
                .count() as u64)
        })
    }

    fn find_shows(
        &self,
        query: ListQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ShowRecord>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::FindShows)?;
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(do_find_shows(&state, &query))
        })
    }

    fn find_show(
        &self,
        id: &str,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShowRecord>, StoreError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::FindShow)?;
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(state
                .shows
                .iter()
                .find(|row| row.id == id)
                .map(|row| show_record(&state, row, include)))
        })
    }

    fn create_show(
        &self,
        data: NewShow,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<ShowRecord, StoreError>> + Send + '_>> {
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::CreateShow)?;
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            do_create_show(&mut state, data, include)
        })
    }

    fn update_show(
        &self,
        id: &str,
        patch: ShowPatch,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShowRecord>, StoreError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::UpdateShow)?;
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            do_update_show(&mut state, &id, patch, include)
        })
    }

    fn delete_show(
        &self,
        id: &str,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShowRecord>, StoreError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::DeleteShow)?;
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(do_delete_show(&mut state, &id, include))
        })
    }

    fn find_events(
        &self,
        selector: EventSelector,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<EventRecord>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::FindEvents)?;
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(do_find_events(&state, &selector))
        })
    }

    fn create_events(
        &self,
        rows: Vec<NewEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::CreateEvents)?;
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            do_create_events(&mut state, rows)
        })
    }

    fn delete_events(
        &self,
        ids: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::DeleteEvents)?;
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(do_delete_events(&mut state, &ids))
        })
    }
}

impl ShowStore for MemoryShowStore {
    fn begin(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn ShowTransaction>, StoreError>> + Send + '_>>
    {
        Box::pin(async move {
            let working = self
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            Ok(Box::new(MemoryShowTransaction {
                shared: Arc::clone(&self.state),
                working: Mutex::new(working),
                failures: Arc::clone(&self.failures),
            }) as Box<dyn ShowTransaction>)
        })
    }
}

/// Snapshot transaction over a [`MemoryShowStore`].
pub struct MemoryShowTransaction {
    shared: Arc<Mutex<State>>,
    working: Mutex<State>,
    failures: FailureMap,
}

impl ShowCatalog for MemoryShowTransaction {
    fn count_shows(
        &self,
        filter: Option<ShowFilter>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::CountShows)?;
            let state = self.working.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(state
                .shows
                .iter()
                .filter(|row| matches(row, filter.as_ref()))
                .count() as u64)
        })
    }

    fn find_shows(
        &self,
        query: ListQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ShowRecord>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::FindShows)?;
            let state = self.working.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(do_find_shows(&state, &query))
        })
    }

    fn find_show(
        &self,
        id: &str,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShowRecord>, StoreError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::FindShow)?;
            let state = self.working.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(state
                .shows
                .iter()
                .find(|row| row.id == id)
                .map(|row| show_record(&state, row, include)))
        })
    }

    fn create_show(
        &self,
        data: NewShow,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<ShowRecord, StoreError>> + Send + '_>> {
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::CreateShow)?;
            let mut state = self.working.lock().unwrap_or_else(PoisonError::into_inner);
            do_create_show(&mut state, data, include)
        })
    }

    fn update_show(
        &self,
        id: &str,
        patch: ShowPatch,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShowRecord>, StoreError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::UpdateShow)?;
            let mut state = self.working.lock().unwrap_or_else(PoisonError::into_inner);
            do_update_show(&mut state, &id, patch, include)
        })
    }

    fn delete_show(
        &self,
        id: &str,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShowRecord>, StoreError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::DeleteShow)?;
            let mut state = self.working.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(do_delete_show(&mut state, &id, include))
        })
    }

    fn find_events(
        &self,
        selector: EventSelector,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<EventRecord>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::FindEvents)?;
            let state = self.working.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(do_find_events(&state, &selector))
        })
    }

    fn create_events(
        &self,
        rows: Vec<NewEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::CreateEvents)?;
            let mut state = self.working.lock().unwrap_or_else(PoisonError::into_inner);
            do_create_events(&mut state, rows)
        })
    }

    fn delete_events(
        &self,
        ids: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::DeleteEvents)?;
            let mut state = self.working.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(do_delete_events(&mut state, &ids))
        })
    }
}

impl ShowTransaction for MemoryShowTransaction {
    fn commit(
        self: Box<Self>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send>> {
        Box::pin(async move {
            take_failure(&self.failures, StoreOp::Commit)?;
            let working = self
                .working
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner);
            *self.shared.lock().unwrap_or_else(PoisonError::into_inner) = working;
            Ok(())
        })
    }

    fn rollback(
        self: Box<Self>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send>> {
        Box::pin(async move {
            drop(self);
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_find_roundtrip() {
        let store = MemoryShowStore::new();
        let record = store
            .create_show(
                NewShow {
                    id: Some("s1".to_string()),
                    title: "Morning Show".to_string(),
                    description: None,
                },
                Include::none(),
            )
            .await
            .unwrap();
        assert_eq!(record.id, "s1");

        let found = store.find_show("s1", Include::events()).await.unwrap();
        assert_eq!(found.unwrap().events, Some(Vec::new()));
    }

    #[tokio::test]
    async fn duplicate_show_id_is_a_data_error() {
        let store = MemoryShowStore::new();
        store.insert_show("s1", "Morning Show");

        let err = store
            .create_show(
                NewShow {
                    id: Some("s1".to_string()),
                    title: "Evening Show".to_string(),
                    description: None,
                },
                Include::none(),
            )
            .await;
        assert!(matches!(err, Err(StoreError::Data(_))));
    }

    #[tokio::test]
    async fn rollback_discards_transaction_writes() {
        let store = MemoryShowStore::new();
        store.insert_show("s1", "Morning Show");

        let tx = store.begin().await.unwrap();
        tx.delete_show("s1", Include::none()).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(store.show_ids(), vec!["s1".to_string()]);
    }

    #[tokio::test]
    async fn commit_publishes_transaction_writes() {
        let store = MemoryShowStore::new();
        store.insert_show("s1", "Morning Show");

        let tx = store.begin().await.unwrap();
        tx.delete_show("s1", Include::none()).await.unwrap();
        tx.commit().await.unwrap();

        assert!(store.show_ids().is_empty());
    }

    #[tokio::test]
    async fn armed_failure_fires_once() {
        let store = MemoryShowStore::new();
        store.fail_next(StoreOp::CountShows, StoreError::Service("down".to_string()));

        assert!(store.count_shows(None).await.is_err());
        assert_eq!(store.count_shows(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn find_events_by_ids_preserves_requested_order() {
        let store = MemoryShowStore::new();
        store.insert_event("e1", Some("s1"), EventKind::Live);
        store.insert_event("e2", Some("s1"), EventKind::Replay);

        let events = store
            .find_events(EventSelector::Ids(vec!["e2".to_string(), "e1".to_string()]))
            .await
            .unwrap();
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e1"]);
    }
}
