//! Store contracts for the two backing stores.
//!
//! The relational store exposes the same method set on a plain client and on
//! an open transaction handle. That duality is modeled as the
//! [`ShowCatalog`] capability trait, implemented by both the
//! direct-connection type and the transaction-scoped type, instead of being
//! duck-typed. [`ShowStore`] adds the ability to open a transaction;
//! [`ShowTransaction`] adds consuming commit/rollback.
//!
//! "Not found" is never an error here: every lookup-by-key operation returns
//! `Option`, so callers can distinguish "nothing to do" from "something
//! broke".
//!
//! # Dyn Compatibility
//!
//! These traits use explicit `Pin<Box<dyn Future>>` returns instead of
//! `async fn` to enable trait object usage (`Arc<dyn ShowStore>`,
//! `Box<dyn ShowTransaction>`).

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

use crate::record::{
    CalendarEntry, EventRecord, EventSelector, Include, ListQuery, NewEvent, NewShow, ShowFilter,
    ShowPatch, ShowRecord,
};

/// Errors that can occur during relational store operations.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Bad input shape or constraint violation. The caller's fault.
    #[error("data error: {0}")]
    Data(String),

    /// The store itself failed. An infrastructure issue.
    #[error("service error: {0}")]
    Service(String),
}

/// Errors that can occur during calendar store operations.
#[derive(Error, Debug, Clone)]
pub enum CalendarError {
    /// Bad input or a missing entry, classified as a validation problem.
    #[error("data error: {0}")]
    Data(String),

    /// The calendar store failed. An infrastructure issue.
    #[error("service error: {0}")]
    Service(String),
}

/// The per-entity operations shared by the direct client and an open
/// transaction handle.
///
/// Implementations must be `Send + Sync`; a transaction handle is only ever
/// owned by the single operation invocation that opened it.
pub trait ShowCatalog: Send + Sync {
    /// Count shows matching the filter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn count_shows(
        &self,
        filter: Option<ShowFilter>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>>;

    /// List shows matching the query, honoring order, limit, and offset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_shows(
        &self,
        query: ListQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ShowRecord>, StoreError>> + Send + '_>>;

    /// Find a single show by id. Returns `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_show(
        &self,
        id: &str,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShowRecord>, StoreError>> + Send + '_>>;

    /// Insert a new show and return the canonical inserted row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Data`] on constraint violations (e.g. duplicate
    /// id) and [`StoreError::Service`] on infrastructure failures.
    fn create_show(
        &self,
        data: NewShow,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<ShowRecord, StoreError>> + Send + '_>>;

    /// Apply a patch to the show with the given id. Returns the updated row,
    /// or `None` when no such show exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn update_show(
        &self,
        id: &str,
        patch: ShowPatch,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShowRecord>, StoreError>> + Send + '_>>;

    /// Delete the show with the given id and return the deleted row, or
    /// `None` when no such show exists. Owned event rows are untouched;
    /// cascading is the consistency core's job.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete fails.
    fn delete_show(
        &self,
        id: &str,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShowRecord>, StoreError>> + Send + '_>>;

    /// Find event rows by selector.
    ///
    /// For [`EventSelector::Ids`] the rows come back in the requested id
    /// order where the store supports it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_events(
        &self,
        selector: EventSelector,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<EventRecord>, StoreError>> + Send + '_>>;

    /// Insert event rows, returning the number inserted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    fn create_events(
        &self,
        rows: Vec<NewEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>>;

    /// Delete event rows by id, returning the number deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete fails.
    fn delete_events(
        &self,
        ids: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>>;
}

/// The direct relational store client.
pub trait ShowStore: ShowCatalog {
    /// Open a transaction. All catalog operations on the returned handle are
    /// all-or-nothing on [`ShowTransaction::commit`] /
    /// [`ShowTransaction::rollback`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Service`] if a transaction cannot be opened.
    fn begin(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn ShowTransaction>, StoreError>> + Send + '_>>;
}

/// An open relational transaction.
///
/// Dropping an uncommitted handle must roll back, but callers are expected to
/// resolve the transaction explicitly: "not found" outcomes roll back
/// deliberately rather than relying on an implicit abort.
pub trait ShowTransaction: ShowCatalog {
    /// Commit every operation performed on this handle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Service`] if the commit fails; no partial state
    /// becomes visible in that case.
    fn commit(
        self: Box<Self>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send>>;

    /// Discard every operation performed on this handle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Service`] if the rollback fails.
    fn rollback(
        self: Box<Self>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send>>;
}

/// The calendar store, keyed by the relational event id space.
pub trait CalendarStore: Send + Sync {
    /// Fetch the calendar entry for an event id.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::Data`] when the entry is missing or the id is
    /// malformed, [`CalendarError::Service`] on infrastructure failures.
    fn get_entry(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<CalendarEntry, CalendarError>> + Send + '_>>;

    /// Delete the calendar entry for an event id. Deleting an already-absent
    /// entry succeeds; cleanup is idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::Service`] on infrastructure failures.
    fn delete_entry(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), CalendarError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        let err = StoreError::Data("duplicate key".to_string());
        assert_eq!(format!("{err}"), "data error: duplicate key");

        let err = StoreError::Service("connection refused".to_string());
        assert_eq!(format!("{err}"), "service error: connection refused");
    }

    #[test]
    fn calendar_error_display() {
        let err = CalendarError::Data("no entry for e1".to_string());
        assert!(format!("{err}").contains("e1"));
    }
}
