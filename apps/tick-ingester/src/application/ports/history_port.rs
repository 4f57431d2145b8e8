//! History Backend Port (Driven Port)
//!
//! Key-value storage for per-symbol history sequences. A backend stores
//! one whole sequence per symbol and replaces it atomically, so readers
//! never observe a half-written sequence.

use async_trait::async_trait;

use crate::domain::tick::HistoryPoint;

/// History storage error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Underlying storage I/O failed.
    #[error("history storage I/O error: {message}")]
    Io {
        /// Error details.
        message: String,
    },

    /// A stored sequence could not be encoded or decoded.
    #[error("history serialization error: {message}")]
    Serialization {
        /// Error details.
        message: String,
    },
}

/// Port for per-symbol history blobs.
#[async_trait]
pub trait HistoryBackend: Send + Sync {
    /// Load the sequence stored for `symbol` (empty if absent).
    async fn load(&self, symbol: &str) -> Result<Vec<HistoryPoint>, StoreError>;

    /// Replace the sequence stored for `symbol` as one atomic unit.
    async fn replace(&self, symbol: &str, points: Vec<HistoryPoint>) -> Result<(), StoreError>;

    /// Short backend name for logs and health output.
    fn kind(&self) -> &'static str;
}
