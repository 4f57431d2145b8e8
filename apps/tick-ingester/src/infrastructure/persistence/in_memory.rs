//! In-memory history backend.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{HistoryBackend, StoreError};
use crate::domain::tick::HistoryPoint;

/// In-memory implementation of `HistoryBackend`.
///
/// History lives for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryHistoryBackend {
    sequences: RwLock<HashMap<String, Vec<HistoryPoint>>>,
}

impl InMemoryHistoryBackend {
    /// Create a new empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sequences: RwLock::new(HashMap::new()),
        }
    }

    /// Get the number of symbols with stored history.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sequences.read().len()
    }

    /// Check if no history is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.read().is_empty()
    }
}

#[async_trait]
impl HistoryBackend for InMemoryHistoryBackend {
    async fn load(&self, symbol: &str) -> Result<Vec<HistoryPoint>, StoreError> {
        Ok(self
            .sequences
            .read()
            .get(symbol)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace(&self, symbol: &str, points: Vec<HistoryPoint>) -> Result<(), StoreError> {
        self.sequences.write().insert(symbol.to_string(), points);
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_symbol_loads_empty() {
        let backend = InMemoryHistoryBackend::new();
        assert!(backend.load("BTC-USD").await.unwrap().is_empty());
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn replace_overwrites_sequence() {
        let backend = InMemoryHistoryBackend::new();
        backend
            .replace("BTC-USD", vec![HistoryPoint::new(1, 1.0)])
            .await
            .unwrap();
        backend
            .replace("BTC-USD", vec![HistoryPoint::new(2, 2.0)])
            .await
            .unwrap();

        assert_eq!(
            backend.load("BTC-USD").await.unwrap(),
            vec![HistoryPoint::new(2, 2.0)]
        );
        assert_eq!(backend.len(), 1);
    }
}
