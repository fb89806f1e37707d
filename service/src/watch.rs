//! Subscriber-side view of the change stream.
//!
//! Wraps a bus subscription on the events topic and parses each payload back
//! into a typed [`ChangeEvent`]. The stream is lazy and unbounded; it yields
//! changes published after the subscription was created.

use futures::{Stream, StreamExt};
use showgrid_core::{ChangeEvent, ChangeEventError, EventBus, EventBusError};
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use crate::service::EVENTS_TOPIC;

/// Errors observed in-band on a watch stream.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The underlying bus reported an error (e.g. the subscriber lagged).
    #[error(transparent)]
    Bus(#[from] EventBusError),

    /// A published payload failed to parse.
    #[error(transparent)]
    Parse(#[from] ChangeEventError),
}

/// Typed stream of committed changes.
pub type ChangeStream = Pin<Box<dyn Stream<Item = Result<ChangeEvent, WatchError>> + Send>>;

/// Subscribes to the change-event topic and parses payloads.
pub struct Watcher {
    bus: Arc<dyn EventBus>,
}

impl Watcher {
    /// Create a watcher over the given bus.
    #[must_use]
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    /// Subscribe to committed changes.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::SubscriptionFailed`] if the subscription
    /// cannot be set up.
    pub async fn subscribe(&self) -> Result<ChangeStream, EventBusError> {
        let stream = self.bus.subscribe(&[EVENTS_TOPIC]).await?;
        Ok(Box::pin(stream.map(|item| {
            let event = item?;
            Ok(event.parse()?)
        })))
    }
}
