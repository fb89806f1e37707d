//! Request and response shapes for the show operations.
//!
//! These are deliberately thin: filter/pagination/ordering arguments pass
//! straight through to the store, and responses carry fully-mapped domain
//! views. `Option<Show>` in a response means "not found", a defined empty
//! outcome, never an error.

use showgrid_core::{Include, ListQuery, NewShow, Show, ShowFilter, ShowPatch};

/// Arguments for counting shows.
#[derive(Clone, Debug, Default)]
pub struct CountRequest {
    /// Row filter.
    pub filter: Option<ShowFilter>,
}

/// Result of counting shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountResponse {
    /// Number of matching shows.
    pub count: u64,
}

/// Arguments for listing shows.
#[derive(Clone, Debug, Default)]
pub struct ListRequest {
    /// Filter, order, pagination, and relations to load.
    pub query: ListQuery,
}

/// Result of listing shows.
#[derive(Clone, Debug, PartialEq)]
pub struct ListResponse {
    /// Mapped shows, in store return order.
    pub shows: Vec<Show>,
}

/// Arguments for fetching one show.
#[derive(Clone, Debug)]
pub struct GetRequest {
    /// Show id to look up.
    pub id: String,
    /// Relations to load.
    pub include: Include,
}

/// Result of fetching one show.
#[derive(Clone, Debug, PartialEq)]
pub struct GetResponse {
    /// The mapped show, or `None` when absent.
    pub show: Option<Show>,
}

/// Arguments for creating a show.
#[derive(Clone, Debug)]
pub struct CreateRequest {
    /// Row data to insert.
    pub data: NewShow,
    /// Relations to load on the returned show.
    pub include: Include,
}

/// Result of creating a show.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateResponse {
    /// The mapped created show.
    pub show: Show,
}

/// Arguments for updating a show.
#[derive(Clone, Debug)]
pub struct UpdateRequest {
    /// Show id to update (the pre-update id).
    pub id: String,
    /// Field-wise patch; may change the id itself.
    pub data: ShowPatch,
    /// Relations to load on the returned show.
    pub include: Include,
}

/// Result of updating a show.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateResponse {
    /// The mapped updated show, or `None` when absent.
    pub show: Option<Show>,
}

/// Arguments for deleting a show.
#[derive(Clone, Debug)]
pub struct DeleteRequest {
    /// Show id to delete.
    pub id: String,
    /// Relations to load on the returned show.
    pub include: Include,
}

/// Result of deleting a show.
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteResponse {
    /// The mapped deleted show, or `None` when absent.
    pub show: Option<Show>,
}
