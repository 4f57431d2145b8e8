//! Prometheus Metrics Module
//!
//! Exposes ingestion metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Datagrams**: Received, discarded by reason, and accepted ticks
//! - **Bus**: Envelopes handed to the bus and publish failures
//! - **Persistence**: Sink writes by outcome and dispatch drops
//! - **Queries**: History reads by outcome
//! - **Latency**: Per-datagram processing and per-sink write times
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the API server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Subsequent calls return the handle installed by the first one.
///
/// # Errors
///
/// Returns `BuildError` if the global recorder cannot be installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Datagram counters
    describe_counter!(
        "tick_ingester_datagrams_received_total",
        "Total datagrams read from the UDP socket"
    );
    describe_counter!(
        "tick_ingester_datagrams_discarded_total",
        "Total datagrams discarded by reason"
    );
    describe_counter!(
        "tick_ingester_ticks_ingested_total",
        "Total datagrams decoded into ticks"
    );

    // Bus counters
    describe_counter!(
        "tick_ingester_envelopes_published_total",
        "Total envelopes handed to the bus"
    );
    describe_counter!(
        "tick_ingester_publish_failures_total",
        "Total envelopes not published, by reason"
    );

    // Persistence counters
    describe_counter!(
        "tick_ingester_persist_dropped_total",
        "Total ticks dropped because a persistence queue was full"
    );
    describe_counter!(
        "tick_ingester_sink_writes_total",
        "Total sink writes by sink and outcome"
    );

    // Query counters
    describe_counter!(
        "tick_ingester_history_queries_total",
        "Total history range queries by outcome"
    );

    // Dependency gauges
    describe_gauge!(
        "tick_ingester_influx_reachable",
        "1 if the last InfluxDB health probe succeeded"
    );

    // Latency histograms
    describe_histogram!(
        "tick_ingester_processing_seconds",
        "Time from datagram receipt to dispatch"
    );
    describe_histogram!(
        "tick_ingester_sink_write_seconds",
        "Time spent in a single sink write"
    );
}

// =============================================================================
// Metric Labels
// =============================================================================

/// Metric labels for publish failures.
#[derive(Debug, Clone, Copy)]
pub enum PublishFailure {
    /// The envelope could not be encoded.
    Encode,
    /// The outbound queue was full.
    QueueFull,
    /// The publisher was closed.
    Closed,
    /// The bus transport rejected the message.
    Transport,
}

impl PublishFailure {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Encode => "encode",
            Self::QueueFull => "queue_full",
            Self::Closed => "closed",
            Self::Transport => "transport",
        }
    }
}

/// Metric labels for sink write outcomes.
#[derive(Debug, Clone, Copy)]
pub enum WriteOutcome {
    /// Write succeeded.
    Ok,
    /// Write failed.
    Error,
}

impl WriteOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Metric labels for history query outcomes.
#[derive(Debug, Clone, Copy)]
pub enum QueryOutcome {
    /// Query returned no points.
    Empty,
    /// Query returned at least one point.
    Found,
    /// Query failed.
    Failed,
}

impl QueryOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Found => "found",
            Self::Failed => "failed",
        }
    }
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a datagram read from the socket.
pub fn record_datagram_received() {
    counter!("tick_ingester_datagrams_received_total").increment(1);
}

/// Record a discarded datagram.
pub fn record_datagram_discarded(reason: &'static str) {
    counter!(
        "tick_ingester_datagrams_discarded_total",
        "reason" => reason
    )
    .increment(1);
}

/// Record an accepted tick.
pub fn record_tick_ingested() {
    counter!("tick_ingester_ticks_ingested_total").increment(1);
}

/// Record an envelope handed to the bus.
pub fn record_envelope_published() {
    counter!("tick_ingester_envelopes_published_total").increment(1);
}

/// Record an envelope that did not reach the bus.
pub fn record_publish_failure(reason: PublishFailure) {
    counter!(
        "tick_ingester_publish_failures_total",
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// Record a tick dropped at persistence dispatch.
pub fn record_persist_dropped() {
    counter!("tick_ingester_persist_dropped_total").increment(1);
}

/// Record a sink write and its duration.
pub fn record_sink_write(sink: &'static str, outcome: WriteOutcome, duration: Duration) {
    counter!(
        "tick_ingester_sink_writes_total",
        "sink" => sink,
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!(
        "tick_ingester_sink_write_seconds",
        "sink" => sink
    )
    .record(duration.as_secs_f64());
}

/// Record a history query.
pub fn record_history_query(outcome: QueryOutcome) {
    counter!(
        "tick_ingester_history_queries_total",
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Update InfluxDB reachability.
pub fn set_influx_reachable(reachable: bool) {
    gauge!("tick_ingester_influx_reachable").set(if reachable { 1.0 } else { 0.0 });
}

/// Record datagram processing duration.
pub fn record_processing_duration(duration: Duration) {
    histogram!("tick_ingester_processing_seconds").record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================
