//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `TickPublisher`: Fire-and-forget envelope fan-out to the bus
//! - `HistoryBackend`: Key-value blob storage for per-symbol history
//! - `TickSink`: Best-effort persistence of one tick
//! - `RangeSource`: Time-windowed reads of persisted points

mod history_port;
mod publisher_port;
mod range_source_port;
mod sink_port;

pub use history_port::{HistoryBackend, StoreError};
pub use publisher_port::{PublishError, TickPublisher};
#[cfg(test)]
pub use range_source_port::MockRangeSource;
pub use range_source_port::{RangeSource, SourceError};
#[cfg(test)]
pub use sink_port::MockTickSink;
pub use sink_port::{SinkError, TickSink};
