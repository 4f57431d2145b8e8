//! Bounded History Store
//!
//! Keeps the most recent [`HISTORY_CAPACITY`] points per symbol on top of
//! any [`HistoryBackend`].
//!
//! # Concurrency
//!
//! `append` is a read-modify-write of a whole sequence, so all appends are
//! serialized by one store-wide async mutex. That also fixes the per-symbol
//! order of entries to the order appends acquire the lock. Reads take no
//! lock: backends replace sequences atomically.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::ports::{
    HistoryBackend, RangeSource, SinkError, SourceError, StoreError, TickSink,
};
use crate::domain::history::{HISTORY_CAPACITY, append_bounded, points_in_range};
use crate::domain::tick::{HistoryPoint, TickRecord, TimeRange};

/// Per-symbol bounded history.
pub struct HistoryStore {
    backend: Arc<dyn HistoryBackend>,
    write_lock: Mutex<()>,
    capacity: usize,
}

impl HistoryStore {
    /// Create a store retaining [`HISTORY_CAPACITY`] points per symbol.
    #[must_use]
    pub fn new(backend: Arc<dyn HistoryBackend>) -> Self {
        Self::with_capacity(backend, HISTORY_CAPACITY)
    }

    /// Create a store with a custom per-symbol capacity.
    #[must_use]
    pub fn with_capacity(backend: Arc<dyn HistoryBackend>, capacity: usize) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
            capacity: capacity.max(1),
        }
    }

    /// Append `point` to the tail of `symbol`'s history.
    ///
    /// Returns the length of the stored sequence after the write.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails to load or replace the
    /// sequence. The stored sequence is unchanged in that case.
    pub async fn append(&self, symbol: &str, point: HistoryPoint) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut points = self.backend.load(symbol).await?;
        let evicted = append_bounded(&mut points, point, self.capacity);
        let len = points.len();
        self.backend.replace(symbol, points).await?;

        if evicted > 0 {
            tracing::trace!(symbol, evicted, "History trimmed");
        }
        Ok(len)
    }

    /// The full stored sequence for `symbol`, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    pub async fn query(&self, symbol: &str) -> Result<Vec<HistoryPoint>, StoreError> {
        self.backend.load(symbol).await
    }

}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("backend", &self.backend.kind())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TickSink for HistoryStore {
    fn name(&self) -> &'static str {
        "history"
    }

    async fn persist(&self, tick: &TickRecord) -> Result<(), SinkError> {
        // Stored sequences are JSON, which has no encoding for NaN or infinity.
        if !tick.price.is_finite() {
            return Err(SinkError::InvalidPoint {
                reason: format!("non-finite price {}", tick.price),
            });
        }
        self.append(&tick.symbol, tick.to_point()).await?;
        Ok(())
    }
}

#[async_trait]
impl RangeSource for HistoryStore {
    async fn points_between(
        &self,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<HistoryPoint>, SourceError> {
        let points = self.query(symbol).await?;
        Ok(points_in_range(&points, range))
    }

    fn name(&self) -> &'static str {
        "history"
    }
}

// =============================================================================
// Tests
// =============================================================================
