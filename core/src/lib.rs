//! # Showgrid Core
//!
//! Core traits and types for the showgrid consistency core.
//!
//! Showgrid keeps two independent backing stores (a relational show/event
//! store and a calendar store holding time payloads) mutually consistent
//! under create/update/delete, and turns every committed state change into a
//! typed change event on a publish/subscribe bus.
//!
//! This crate defines the seams between those parts:
//!
//! - [`record`]: raw relational records and calendar payloads, plus the
//!   write/read plumbing types the store contracts use
//! - [`domain`]: fully-resolved domain views merged from both stores
//! - [`change`]: the tagged union of outbound change notifications and its
//!   JSON wire format
//! - [`store`]: the relational store capability traits (shared by the direct
//!   client and an open transaction handle) and the calendar store contract
//! - [`bus`]: the event bus contract and subscription stream type
//!
//! Implementations live in sibling crates: `showgrid-postgres` (relational
//! store), `showgrid-calendar` (calendar client), `showgrid-channels`
//! (broadcast bus), and `showgrid-testing` (in-memory mocks). The
//! orchestration that ties them together is in `showgrid-service`.

pub mod bus;
pub mod change;
pub mod domain;
pub mod record;
pub mod store;

pub use bus::{EventBus, EventBusError, EventStream};
pub use change::{ChangeEvent, ChangeEventError, SerializedEvent};
pub use domain::{Event, Show};
pub use record::{
    CalendarEntry, EventKind, EventRecord, EventSelector, Frequency, Include, ListQuery, NewEvent,
    NewShow, Recurrence, ShowFilter, ShowOrder, ShowPatch, ShowRecord,
};
pub use store::{CalendarError, CalendarStore, ShowCatalog, ShowStore, ShowTransaction, StoreError};
