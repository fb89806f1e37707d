//! In-process broadcast event bus for showgrid.
//!
//! This crate implements the [`EventBus`] trait from `showgrid-core` on top
//! of per-topic [`tokio::sync::broadcast`] channels. It is the process-wide
//! fan-out channel behind change notifications:
//!
//! - **No persistence**: events live only in subscriber buffers. A crashed
//!   subscriber loses whatever was published during its downtime.
//! - **No replay**: a subscription receives events published after it was
//!   created, never historical ones.
//! - **Fire-and-forget publish**: publishing with zero subscribers succeeds;
//!   delivery is never acknowledged.
//! - **Per-operation ordering**: events published in sequence arrive at each
//!   subscriber in that sequence.
//!
//! A subscriber that falls more than `buffer` events behind observes an
//! in-band [`EventBusError::Lagged`] item and then continues with the oldest
//! retained event.
//!
//! # Example
//!
//! ```no_run
//! use showgrid_channels::BroadcastChannels;
//! use showgrid_core::{EventBus, SerializedEvent};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = BroadcastChannels::default();
//!
//! let mut stream = bus.subscribe(&["events"]).await?;
//!
//! let event = SerializedEvent::new("ShowCreated".to_string(), "{}".to_string());
//! bus.publish("events", &event).await?;
//!
//! if let Some(Ok(received)) = stream.next().await {
//!     println!("received {}", received.event_type);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use showgrid_core::{EventBus, EventBusError, EventStream, SerializedEvent};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;
use tokio::sync::broadcast;

/// Default per-topic buffer capacity.
pub const DEFAULT_BUFFER: usize = 1024;

/// Broadcast-channel event bus.
///
/// Topics are created lazily on first publish or subscribe. The bus itself
/// is cheap to share behind an `Arc<dyn EventBus>`.
pub struct BroadcastChannels {
    buffer: usize,
    topics: RwLock<HashMap<String, broadcast::Sender<SerializedEvent>>>,
}

impl BroadcastChannels {
    /// Create a bus with the given per-topic buffer capacity.
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer,
            topics: RwLock::new(HashMap::new()),
        }
    }

    /// Get or lazily create the sender for a topic.
    fn sender(&self, topic: &str) -> Result<broadcast::Sender<SerializedEvent>, EventBusError> {
        if let Some(sender) = self
            .topics
            .read()
            .map_err(|e| EventBusError::Other(format!("topics lock poisoned: {e}")))?
            .get(topic)
        {
            return Ok(sender.clone());
        }

        let mut topics = self
            .topics
            .write()
            .map_err(|e| EventBusError::Other(format!("topics lock poisoned: {e}")))?;
        let sender = topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer).0);
        Ok(sender.clone())
    }
}

impl Default for BroadcastChannels {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

impl EventBus for BroadcastChannels {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let sender = self.sender(topic);
        let topic = topic.to_string();
        let event = event.clone();

        Box::pin(async move {
            let sender = sender?;
            // send only fails with zero receivers, which is fine here.
            let receivers = sender.send(event.clone()).unwrap_or(0);
            tracing::trace!(
                topic = %topic,
                event_type = %event.event_type,
                receivers,
                "published event"
            );
            Ok(())
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let topics: Vec<String> = topics.iter().map(ToString::to_string).collect();

        Box::pin(async move {
            let mut streams = Vec::with_capacity(topics.len());

            for topic in topics {
                let mut receiver = self.sender(&topic)?.subscribe();

                let stream = async_stream::stream! {
                    loop {
                        match receiver.recv().await {
                            Ok(event) => yield Ok(event),
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                yield Err(EventBusError::Lagged {
                                    topic: topic.clone(),
                                    skipped,
                                });
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                };
                streams.push(Box::pin(stream) as EventStream);
            }

            Ok(Box::pin(futures::stream::select_all(streams)) as EventStream)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn event(event_type: &str) -> SerializedEvent {
        SerializedEvent::new(event_type.to_string(), format!(r#"{{"type":"{event_type}"}}"#))
    }

    #[tokio::test]
    async fn fans_out_to_all_current_subscribers() {
        let bus = BroadcastChannels::default();

        let mut first = bus.subscribe(&["events"]).await.unwrap();
        let mut second = bus.subscribe(&["events"]).await.unwrap();

        bus.publish("events", &event("ShowCreated")).await.unwrap();

        let got = first.next().await.unwrap().unwrap();
        assert_eq!(got.event_type, "ShowCreated");
        let got = second.next().await.unwrap().unwrap();
        assert_eq!(got.event_type, "ShowCreated");
    }

    #[tokio::test]
    async fn no_replay_before_subscription() {
        let bus = BroadcastChannels::default();

        bus.publish("events", &event("ShowCreated")).await.unwrap();

        let mut stream = bus.subscribe(&["events"]).await.unwrap();
        bus.publish("events", &event("ShowUpdated")).await.unwrap();

        let got = stream.next().await.unwrap().unwrap();
        assert_eq!(got.event_type, "ShowUpdated");
    }

    #[tokio::test]
    async fn preserves_publish_order_within_a_topic() {
        let bus = BroadcastChannels::default();
        let mut stream = bus.subscribe(&["events"]).await.unwrap();

        for event_type in ["ShowUpdated", "EventUpdated", "EventUpdated"] {
            bus.publish("events", &event(event_type)).await.unwrap();
        }

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(stream.next().await.unwrap().unwrap().event_type);
        }
        assert_eq!(seen, vec!["ShowUpdated", "EventUpdated", "EventUpdated"]);
    }

    #[tokio::test]
    async fn publish_without_subscribers_succeeds() {
        let bus = BroadcastChannels::default();
        bus.publish("events", &event("ShowDeleted")).await.unwrap();
    }

    #[tokio::test]
    async fn lagged_subscriber_sees_in_band_error_and_continues() {
        let bus = BroadcastChannels::new(1);
        let mut stream = bus.subscribe(&["events"]).await.unwrap();

        bus.publish("events", &event("ShowCreated")).await.unwrap();
        bus.publish("events", &event("ShowUpdated")).await.unwrap();
        bus.publish("events", &event("ShowDeleted")).await.unwrap();

        let first = stream.next().await.unwrap();
        assert!(matches!(first, Err(EventBusError::Lagged { skipped: 2, .. })));

        let next = stream.next().await.unwrap().unwrap();
        assert_eq!(next.event_type, "ShowDeleted");
    }
}
