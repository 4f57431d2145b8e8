//! Tick Publisher Port (Driven Port)
//!
//! Interface for handing encoded envelopes to the message bus.

use bytes::Bytes;

/// Envelope publish error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// The outbound queue is full; the envelope was dropped.
    #[error("publish queue full")]
    QueueFull,

    /// The publisher has been shut down.
    #[error("publisher closed")]
    Closed,

    /// The transport rejected the envelope.
    #[error("bus transport error: {message}")]
    Transport {
        /// Error details.
        message: String,
    },
}

/// Port for fire-and-forget envelope publishing.
///
/// Implementations must not block or suspend the caller: the envelope is
/// either accepted for delivery or rejected immediately. No acknowledgment
/// is awaited and nothing is retried.
pub trait TickPublisher: Send + Sync {
    /// Hand one envelope to the bus.
    fn publish(&self, envelope: Bytes) -> Result<(), PublishError>;

    /// Topic the envelopes are published on.
    fn topic(&self) -> &str;
}
