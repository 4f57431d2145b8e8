//! Message Bus Adapters
//!
//! Implementations of [`TickPublisher`](crate::application::ports::TickPublisher):
//!
//! - [`NatsPublisher`]: production adapter publishing to a NATS subject
//! - [`BroadcastBus`]: in-process fan-out over a tokio broadcast channel
//!
//! Both hand envelopes off without waiting for delivery. Delivery failures
//! are logged and counted, never retried.

mod broadcast;
mod nats;

pub use broadcast::{BroadcastBus, DEFAULT_BROADCAST_CAPACITY};
pub use nats::{NatsConnectError, NatsPublisher, NatsPublisherConfig};
