//! In-memory calendar store.

use showgrid_core::{CalendarEntry, CalendarError, CalendarStore};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

/// Operations a failure can be armed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CalendarOp {
    /// `get_entry`
    GetEntry,
    /// `delete_entry`
    DeleteEntry,
}

/// In-memory implementation of [`CalendarStore`].
///
/// Entries are preloaded with [`MemoryCalendarStore::insert`]; deletions are
/// recorded so tests can assert on cleanup. One-shot failures can be armed
/// per operation.
#[derive(Default)]
pub struct MemoryCalendarStore {
    entries: Mutex<HashMap<String, CalendarEntry>>,
    deleted: Mutex<Vec<String>>,
    failures: Mutex<HashMap<CalendarOp, CalendarError>>,
}

impl MemoryCalendarStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload an entry.
    pub fn insert(&self, entry: CalendarEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(entry.id.clone(), entry);
    }

    /// Arm a one-shot failure for the next call to `op`.
    pub fn fail_next(&self, op: CalendarOp, error: CalendarError) {
        let mut map = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        map.insert(op, error);
    }

    /// Ids deleted so far, in deletion order.
    #[must_use]
    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn take_failure(&self, op: CalendarOp) -> Result<(), CalendarError> {
        let mut map = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        match map.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl CalendarStore for MemoryCalendarStore {
    fn get_entry(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<CalendarEntry, CalendarError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            self.take_failure(CalendarOp::GetEntry)?;
            let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries
                .get(&id)
                .cloned()
                .ok_or_else(|| CalendarError::Data(format!("no calendar entry for {id}")))
        })
    }

    fn delete_entry(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), CalendarError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            self.take_failure(CalendarOp::DeleteEntry)?;
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.remove(&id);
            self.deleted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(id);
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::helpers::sample_entry;

    #[tokio::test]
    async fn missing_entry_is_a_data_error() {
        let store = MemoryCalendarStore::new();
        let err = store.get_entry("e1").await;
        assert!(matches!(err, Err(CalendarError::Data(_))));
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_recorded() {
        let store = MemoryCalendarStore::new();
        store.insert(sample_entry("e1"));

        store.delete_entry("e1").await.unwrap();
        store.delete_entry("e1").await.unwrap();

        assert_eq!(store.deleted_ids(), vec!["e1".to_string(), "e1".to_string()]);
    }
}
