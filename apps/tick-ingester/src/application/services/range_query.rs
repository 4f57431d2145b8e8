//! Range Query Service
//!
//! Answers "all points for a symbol within a time window" over any
//! [`RangeSource`]. Results are always ascending by time and never absent:
//! no matching data yields an empty vector. Source failures collapse into a
//! single opaque [`QueryError::QueryFailed`]; the cause is logged here and
//! never returned to the caller.

use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::RangeSource;
use crate::domain::tick::{DEFAULT_QUERY_WINDOW, HistoryPoint, TimeRange};
use crate::infrastructure::metrics::{QueryOutcome, record_history_query};

/// Range query error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The symbol was empty.
    #[error("missing symbol")]
    EmptySymbol,

    /// The underlying source failed.
    #[error("query failed")]
    QueryFailed,
}

/// Time-windowed history reads.
#[derive(Clone)]
pub struct RangeQueryService {
    source: Arc<dyn RangeSource>,
    default_window: Duration,
}

impl RangeQueryService {
    /// Create a service with the default 24 hour window.
    #[must_use]
    pub fn new(source: Arc<dyn RangeSource>) -> Self {
        Self::with_window(source, DEFAULT_QUERY_WINDOW)
    }

    /// Create a service with a custom default window.
    #[must_use]
    pub fn with_window(source: Arc<dyn RangeSource>, default_window: Duration) -> Self {
        Self {
            source,
            default_window,
        }
    }

    /// Points for `symbol` within `[since, until]`, ascending by time.
    ///
    /// Missing bounds default to the window ending now.
    ///
    /// # Errors
    ///
    /// - `QueryError::EmptySymbol` if `symbol` is empty or blank.
    /// - `QueryError::QueryFailed` if the source fails.
    pub async fn query(
        &self,
        symbol: &str,
        since: Option<i64>,
        until: Option<i64>,
    ) -> Result<Vec<HistoryPoint>, QueryError> {
        if symbol.trim().is_empty() {
            return Err(QueryError::EmptySymbol);
        }

        let range = TimeRange::resolve(since, until, self.default_window);
        if range.is_empty() {
            record_history_query(QueryOutcome::Empty);
            return Ok(Vec::new());
        }

        match self.source.points_between(symbol, range).await {
            Ok(mut points) => {
                points.retain(|p| range.contains(p.time));
                points.sort_by_key(|p| p.time);
                record_history_query(if points.is_empty() {
                    QueryOutcome::Empty
                } else {
                    QueryOutcome::Found
                });
                Ok(points)
            }
            Err(e) => {
                tracing::error!(
                    symbol,
                    source = self.source.name(),
                    since = range.since,
                    until = range.until,
                    error = %e,
                    "Range query failed"
                );
                record_history_query(QueryOutcome::Failed);
                Err(QueryError::QueryFailed)
            }
        }
    }

    /// Name of the backing source.
    #[must_use]
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }
}

impl std::fmt::Debug for RangeQueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeQueryService")
            .field("source", &self.source.name())
            .field("default_window", &self.default_window)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
