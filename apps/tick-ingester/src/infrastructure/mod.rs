//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer, plus the process-level plumbing
//! (configuration, logging, metrics).

/// Read API: history routes, health checks and metrics scrape.
pub mod api;

/// Envelope publishers (NATS and in-process broadcast).
pub mod bus;

/// Datagram text decoding and protobuf envelope encoding.
pub mod codec;

/// Configuration loaded from the environment.
pub mod config;

/// InfluxDB line-protocol writes and Flux range reads.
pub mod influx;

/// UDP receiver, per-datagram pipeline and persistence workers.
pub mod ingest;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// History backends (memory, JSON files).
pub mod persistence;

/// Logging and OpenTelemetry tracing.
pub mod telemetry;
