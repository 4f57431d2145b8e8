//! Per-datagram ingestion pipeline.
//!
//! ```text
//! datagram ─▶ decode ─▶ stamp ─▶ encode ─▶ publish   (fire-and-forget)
//!                                   └────▶ dispatch  (persistence pool)
//! ```

use std::sync::Arc;
use std::time::Instant;

use crate::application::ports::{PublishError, TickPublisher};
use crate::domain::tick::TickRecord;
use crate::infrastructure::codec::{FrameError, WireDecoder, encode_envelope};
use crate::infrastructure::metrics::{
    PublishFailure, record_datagram_discarded, record_datagram_received,
    record_envelope_published, record_persist_dropped, record_processing_duration,
    record_publish_failure, record_tick_ingested,
};

use super::stats::IngestStats;
use super::workers::{DispatchError, PersistencePool};

/// What happened to one datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The datagram was malformed and dropped.
    Discarded(FrameError),
    /// The tick could not be encoded and was dropped.
    EncodeFailed,
    /// The tick was accepted.
    Ingested {
        /// Whether the publisher accepted the envelope.
        published: bool,
        /// Whether the persistence pool accepted the tick.
        dispatched: bool,
    },
}

/// Decode, encode, publish and dispatch.
pub struct IngestPipeline {
    decoder: WireDecoder,
    publisher: Arc<dyn TickPublisher>,
    pool: Arc<PersistencePool>,
    stats: Arc<IngestStats>,
}

impl IngestPipeline {
    /// Create a pipeline.
    #[must_use]
    pub fn new(
        decoder: WireDecoder,
        publisher: Arc<dyn TickPublisher>,
        pool: Arc<PersistencePool>,
        stats: Arc<IngestStats>,
    ) -> Self {
        Self {
            decoder,
            publisher,
            pool,
            stats,
        }
    }

    /// Shared ingestion stats.
    #[must_use]
    pub const fn stats(&self) -> &Arc<IngestStats> {
        &self.stats
    }

    /// Process one datagram. Never blocks on the bus or the sinks.
    pub fn handle(&self, datagram: &[u8]) -> IngestOutcome {
        let started = Instant::now();
        self.stats.increment_received();
        record_datagram_received();

        let frame = match self.decoder.decode(datagram) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(reason = e.reason(), error = %e, "Datagram discarded");
                self.stats.increment_discarded();
                record_datagram_discarded(e.reason());
                return IngestOutcome::Discarded(e);
            }
        };

        let tick = TickRecord::received_now(frame.symbol, frame.price, frame.volume);

        let envelope = match encode_envelope(&tick) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(symbol = %tick.symbol, error = %e, "Envelope encode failed");
                self.stats.increment_encode_failures();
                record_publish_failure(PublishFailure::Encode);
                return IngestOutcome::EncodeFailed;
            }
        };

        self.stats.increment_ingested();
        record_tick_ingested();

        let published = match self.publisher.publish(envelope) {
            Ok(()) => {
                record_envelope_published();
                true
            }
            Err(e) => {
                tracing::warn!(
                    symbol = %tick.symbol,
                    topic = self.publisher.topic(),
                    error = %e,
                    "Envelope not published"
                );
                self.stats.increment_publish_failures();
                record_publish_failure(match e {
                    PublishError::QueueFull => PublishFailure::QueueFull,
                    PublishError::Closed => PublishFailure::Closed,
                    PublishError::Transport { .. } => PublishFailure::Transport,
                });
                false
            }
        };

        let symbol = tick.symbol.clone();
        let dispatched = match self.pool.dispatch(tick) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Tick not persisted");
                if e == DispatchError::QueueFull {
                    self.stats.increment_persist_dropped();
                    record_persist_dropped();
                }
                false
            }
        };

        record_processing_duration(started.elapsed());
        IngestOutcome::Ingested {
            published,
            dispatched,
        }
    }
}

impl std::fmt::Debug for IngestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestPipeline")
            .field("decoder", &self.decoder)
            .field("topic", &self.publisher.topic())
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
