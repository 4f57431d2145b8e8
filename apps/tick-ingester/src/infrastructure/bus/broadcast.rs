//! Broadcast Bus
//!
//! In-process bus backed by a tokio broadcast channel. Every subscriber sees
//! every envelope published after it subscribed; publishing with no
//! subscribers succeeds and the envelope is dropped.

use bytes::Bytes;
use tokio::sync::broadcast;

use crate::application::ports::{PublishError, TickPublisher};

/// Default channel capacity.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 10_000;

/// In-process envelope bus.
///
/// # Example
///
/// ```rust
/// use tick_ingester::infrastructure::bus::BroadcastBus;
///
/// let bus = BroadcastBus::new("market.ticks", 16);
/// let rx = bus.subscribe();
/// assert_eq!(bus.receiver_count(), 1);
/// # drop(rx);
/// ```
#[derive(Debug)]
pub struct BroadcastBus {
    topic: String,
    tx: broadcast::Sender<Bytes>,
}

impl BroadcastBus {
    /// Create a bus for `topic` with the given channel capacity.
    #[must_use]
    pub fn new(topic: impl Into<String>, capacity: usize) -> Self {
        Self {
            topic: topic.into(),
            tx: broadcast::channel(capacity.max(1)).0,
        }
    }

    /// Create a bus with [`DEFAULT_BROADCAST_CAPACITY`].
    #[must_use]
    pub fn with_defaults(topic: impl Into<String>) -> Self {
        Self::new(topic, DEFAULT_BROADCAST_CAPACITY)
    }

    /// Get a new receiver for envelopes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Bytes> {
        self.tx.subscribe()
    }

    /// Get the number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl TickPublisher for BroadcastBus {
    fn publish(&self, envelope: Bytes) -> Result<(), PublishError> {
        // No receivers is not a failure: the bus is fire-and-forget.
        let _ = self.tx.send(envelope);
        Ok(())
    }

    fn topic(&self) -> &str {
        &self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receiver_count_tracks_subscribers() {
        let bus = BroadcastBus::with_defaults("market.ticks");
        assert_eq!(bus.receiver_count(), 0);

        {
            let _rx = bus.subscribe();
            assert_eq!(bus.receiver_count(), 1);
        }

        assert_eq!(bus.receiver_count(), 0);
    }

    #[test]
    fn publish_without_receivers_succeeds() {
        let bus = BroadcastBus::with_defaults("market.ticks");
        assert!(bus.publish(Bytes::from_static(b"x")).is_ok());
    }

    #[tokio::test]
    async fn every_receiver_gets_the_envelope() {
        let bus = BroadcastBus::new("market.ticks", 8);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(Bytes::from_static(b"tick")).unwrap();

        assert_eq!(rx1.recv().await.unwrap(), Bytes::from_static(b"tick"));
        assert_eq!(rx2.recv().await.unwrap(), Bytes::from_static(b"tick"));
    }

    #[test]
    fn topic_is_reported() {
        assert_eq!(BroadcastBus::new("prices", 1).topic(), "prices");
    }
}
