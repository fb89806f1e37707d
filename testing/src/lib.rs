//! # Showgrid Testing
//!
//! In-memory implementations of the showgrid store contracts, plus helpers
//! for asserting on published change events.
//!
//! This crate provides:
//! - [`MemoryShowStore`]: vec-backed relational store with snapshot
//!   transactions and one-shot failure injection
//! - [`MemoryCalendarStore`]: preloadable calendar store that records
//!   deletions and can be armed to fail
//! - [`helpers`]: sample data and subscription assertion helpers

pub mod calendar;
pub mod helpers;
pub mod show_store;

pub use calendar::{CalendarOp, MemoryCalendarStore};
pub use helpers::{sample_entry, take_changes};
pub use show_store::{MemoryShowStore, StoreOp};
