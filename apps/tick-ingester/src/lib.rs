#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Tick Ingester - Datagram Price Feed Pipeline
//!
//! Receives `SYMBOL,PRICE` datagrams over UDP, publishes each accepted tick
//! as a protobuf envelope on NATS, persists it to a bounded per-symbol
//! history and InfluxDB, and serves per-symbol history over HTTP.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Tick types and retention rules
//!   - `tick`: Tick records, history points, time windows
//!   - `history`: Bounded append and range filtering
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Publisher, sink, history backend and range source contracts
//!   - `services`: Bounded history store, range queries
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `codec`: Datagram decoding, envelope encoding
//!   - `bus`: NATS and in-process publishers
//!   - `ingest`: UDP receiver, pipeline, persistence workers
//!   - `persistence`: Memory and file history backends
//!   - `influx`: InfluxDB writes and Flux reads
//!   - `api`: Read API, health checks, metrics scrape
//!   - `config`, `metrics`, `telemetry`: Process plumbing
//!
//! # Data Flow
//!
//! ```text
//!                                  ┌──────────────┐
//!                           ┌─────►│     NATS     │──► subscribers
//! UDP ──► decode ──► encode ┤      └──────────────┘
//!                           │      ┌──────────────┐     ┌──────────┐
//!                           └─────►│  persistence │──┬─►│ history  │◄─┐
//!                                  │    workers   │  │  └──────────┘  │
//!                                  └──────────────┘  │  ┌──────────┐  │
//!                                                    └─►│ influxdb │◄─┤
//!                                                       └──────────┘  │
//!                                      GET /history/{symbol} ─────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Tick types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::history::HISTORY_CAPACITY;
pub use domain::tick::{HistoryPoint, TickRecord, TimeRange};

// Ports and services
pub use application::ports::{
    HistoryBackend, PublishError, RangeSource, SinkError, SourceError, StoreError, TickPublisher,
    TickSink,
};
pub use application::services::{HistoryStore, QueryError, RangeQueryService};

// Infrastructure config
pub use infrastructure::config::{
    ConfigError, HistoryBackendKind, IngesterConfig, QuerySource, ServerSettings,
};

// Codec
pub use infrastructure::codec::{
    PricePolicy, TickerUpdate, WireDecoder, decode_envelope, encode_envelope,
};

// Bus
pub use infrastructure::bus::{BroadcastBus, NatsPublisher, NatsPublisherConfig};

// Ingestion
pub use infrastructure::ingest::{
    DatagramReceiver, IngestOutcome, IngestPipeline, IngestStats, PersistencePool, PoolConfig,
};

// Storage
pub use infrastructure::influx::{InfluxClient, InfluxConfig};
pub use infrastructure::persistence::{FileHistoryBackend, InMemoryHistoryBackend};

// Read API
pub use infrastructure::api::{ApiServer, ApiServerError, ApiState, router};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
