//! Range Source Port (Driven Port)
//!
//! Interface for time-windowed reads of persisted history.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::tick::{HistoryPoint, TimeRange};

/// Range read error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    /// The source could not be reached.
    #[error("range source connection error: {message}")]
    Connection {
        /// Error details.
        message: String,
    },

    /// The source answered with a non-success status.
    #[error("range source rejected query ({status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The source answered with something that could not be read.
    #[error("malformed range response: {message}")]
    Malformed {
        /// Error details.
        message: String,
    },

    /// History storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Port for range reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RangeSource: Send + Sync {
    /// Points for `symbol` with time inside `range`.
    ///
    /// Implementations should return points ascending by time; callers
    /// re-sort anyway.
    async fn points_between(
        &self,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<HistoryPoint>, SourceError>;

    /// Short source name for logs.
    fn name(&self) -> &'static str;
}
