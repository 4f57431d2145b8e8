//! Datagram Ingestion
//!
//! The write path from the UDP socket to the bus and the sinks:
//!
//! - [`DatagramReceiver`]: binds the socket and drives the loop
//! - [`IngestPipeline`]: per-datagram decode, encode, publish, dispatch
//! - [`PersistencePool`]: symbol-sharded sink writers
//! - [`IngestStats`]: counters shared with the read API

mod pipeline;
mod receiver;
mod stats;
mod workers;

pub use pipeline::{IngestOutcome, IngestPipeline};
pub use receiver::{DatagramReceiver, IngestError};
pub use stats::{IngestSnapshot, IngestStats};
pub use workers::{
    DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS, DispatchError, PersistencePool, PoolConfig,
};
