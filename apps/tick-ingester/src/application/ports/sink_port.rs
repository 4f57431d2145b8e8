//! Tick Sink Port (Driven Port)
//!
//! Interface for best-effort persistence of a single tick. Every
//! configured sink receives every tick; a failing sink never affects
//! the others.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::tick::TickRecord;

/// Tick persistence error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SinkError {
    /// The sink could not be reached.
    #[error("sink unreachable: {message}")]
    Unreachable {
        /// Error details.
        message: String,
    },

    /// The sink answered with a non-success status.
    #[error("sink rejected write ({status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The tick cannot be represented by this sink.
    #[error("invalid point: {reason}")]
    InvalidPoint {
        /// Why the point was refused.
        reason: String,
    },

    /// History storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Port for persisting ticks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TickSink: Send + Sync {
    /// Short sink name for logs and metrics labels.
    fn name(&self) -> &'static str;

    /// Persist one tick. Called at most once per tick; never retried.
    async fn persist(&self, tick: &TickRecord) -> Result<(), SinkError>;
}
