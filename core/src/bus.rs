//! Event bus abstraction for change-event fan-out.
//!
//! The bus is a process-wide publish/subscribe channel: [`EventBus::publish`]
//! is fire-and-forget from the publisher's perspective, and every current
//! subscriber of a topic observes the published event. There is no
//! persistence and no replay: a subscription starts receiving from the
//! moment it is created, and a crashed subscriber loses whatever was emitted
//! during its downtime.
//!
//! The only ordering contract is per logical operation: events published by
//! one operation, in sequence, arrive at each subscriber in that sequence.
//! Nothing is guaranteed across operations running concurrently.
//!
//! # Dyn Compatibility
//!
//! The trait uses explicit `Pin<Box<dyn Future>>` returns instead of
//! `async fn` so it can be passed around as `Arc<dyn EventBus>`. The bus is
//! an explicitly injected dependency, never ambient global state.

use crate::change::SerializedEvent;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    /// Failed to publish an event to a topic.
    #[error("publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed.
        topic: String,
        /// The reason for failure.
        reason: String,
    },

    /// Failed to subscribe to topics.
    #[error("subscription failed for topics {topics:?}: {reason}")]
    SubscriptionFailed {
        /// The topics that failed to subscribe.
        topics: Vec<String>,
        /// The reason for failure.
        reason: String,
    },

    /// A subscriber fell behind and missed events.
    #[error("subscriber lagged, skipped {skipped} events on topic '{topic}'")]
    Lagged {
        /// The topic the subscriber lagged on.
        topic: String,
        /// How many events were skipped.
        skipped: u64,
    },

    /// Generic error for other failures.
    #[error("event bus error: {0}")]
    Other(String),
}

/// Stream of events from a subscription.
///
/// Each item is a `Result`: an event, or an in-band error such as
/// [`EventBusError::Lagged`] after which the stream continues.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<SerializedEvent, EventBusError>> + Send>>;

/// Trait for event bus implementations.
///
/// Implementations must be `Send + Sync`; the bus is shared across all
/// concurrent operations without acquisition.
pub trait EventBus: Send + Sync {
    /// Publish an event to a topic.
    ///
    /// Publishing to a topic nobody subscribes to succeeds; delivery is
    /// never acknowledged to the publisher.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] if the publish operation
    /// itself fails.
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>>;

    /// Subscribe to one or more topics.
    ///
    /// The returned [`EventStream`] is lazy and unbounded; it yields events
    /// published after this call, never historical ones.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::SubscriptionFailed`] if the subscription
    /// cannot be set up.
    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lagged_error_display() {
        let err = EventBusError::Lagged {
            topic: "events".to_string(),
            skipped: 3,
        };
        let display = format!("{err}");
        assert!(display.contains("skipped 3"));
        assert!(display.contains("events"));
    }
}
