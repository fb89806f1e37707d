//! # Showgrid Service
//!
//! The cross-store consistency core: orchestrates show create/update/delete
//! across the relational show store and the calendar store, and publishes
//! exactly one change event per logically committed state change, in an
//! order consistent with commit order.
//!
//! ## Guarantees
//!
//! - Relational mutations that touch more than one row run inside a single
//!   transaction; readers outside the transaction never observe a partial
//!   show/event mutation.
//! - Change events are published only after the transaction that produced
//!   them has committed, never before and never on rollback. Within one
//!   operation the show-level event precedes the per-row events, which
//!   follow the store's return order.
//! - "Not found" is an explicit empty result, not an error, and produces no
//!   side effects.
//! - Calendar cleanup after a committed delete is best-effort: a failure
//!   surfaces as [`ServiceError::CalendarStore`] while the committed
//!   deletion and the already-published events remain valid.
//!
//! ## Collaborators
//!
//! The service takes its three collaborators ([`showgrid_core::ShowStore`],
//! [`showgrid_core::CalendarStore`], [`showgrid_core::EventBus`]) as
//! explicitly injected `Arc<dyn …>` dependencies.

pub mod error;
pub mod mapper;
pub mod requests;
pub mod service;
pub mod watch;

pub use error::ServiceError;
pub use mapper::Mapper;
pub use requests::{
    CountRequest, CountResponse, CreateRequest, CreateResponse, DeleteRequest, DeleteResponse,
    GetRequest, GetResponse, ListRequest, ListResponse, UpdateRequest, UpdateResponse,
};
pub use service::{EVENTS_TOPIC, ShowService};
pub use watch::{ChangeStream, WatchError, Watcher};
