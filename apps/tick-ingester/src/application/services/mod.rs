//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `HistoryStore`: Bounded per-symbol history over a `HistoryBackend`
//! - `RangeQueryService`: Time-windowed, ascending reads over a `RangeSource`

mod history_store;
mod range_query;

pub use history_store::HistoryStore;
pub use range_query::{QueryError, RangeQueryService};
