//! Tick Types
//!
//! Core domain types for price ticks: the record built for every accepted
//! datagram, the compact point kept in per-symbol history, and the
//! inclusive time window used by range reads.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Volume assigned to ticks whose wire frame carries none.
pub const DEFAULT_VOLUME: f64 = 500.0;

/// Default look-back window for range reads.
pub const DEFAULT_QUERY_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

// =============================================================================
// Tick Record
// =============================================================================

/// One price observation for a symbol, stamped at receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct TickRecord {
    /// Instrument identifier, used verbatim from the wire.
    pub symbol: String,
    /// Observed price.
    pub price: f64,
    /// Traded volume (defaulted when absent from the frame).
    pub volume: f64,
    /// Receipt time in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl TickRecord {
    /// Create a tick stamped with the current wall-clock time.
    #[must_use]
    pub fn received_now(symbol: String, price: f64, volume: f64) -> Self {
        Self {
            symbol,
            price,
            volume,
            timestamp: now_millis(),
        }
    }

    /// The history point persisted for this tick.
    #[must_use]
    pub const fn to_point(&self) -> HistoryPoint {
        HistoryPoint::new(self.timestamp, self.price)
    }
}

// =============================================================================
// History Point
// =============================================================================

/// A `(time, price)` pair in a per-symbol history.
///
/// Serialized as `{"t": <ms>, "p": <price>}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "t")]
    pub time: i64,
    /// Price at that time.
    #[serde(rename = "p")]
    pub price: f64,
}

impl HistoryPoint {
    /// Create a new point.
    #[must_use]
    pub const fn new(time: i64, price: f64) -> Self {
        Self { time, price }
    }
}

// =============================================================================
// Time Range
// =============================================================================

/// Inclusive `[since, until]` window in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Lower bound (inclusive).
    pub since: i64,
    /// Upper bound (inclusive).
    pub until: i64,
}

impl TimeRange {
    /// Create a window from explicit bounds.
    #[must_use]
    pub const fn new(since: i64, until: i64) -> Self {
        Self { since, until }
    }

    /// The window of length `window` ending at `until`.
    #[must_use]
    pub fn ending_at(until: i64, window: Duration) -> Self {
        let span = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        Self {
            since: until.saturating_sub(span),
            until,
        }
    }

    /// Resolve optional bounds against the current time.
    ///
    /// A missing `until` means now; a missing `since` means `window`
    /// before `until`.
    #[must_use]
    pub fn resolve(since: Option<i64>, until: Option<i64>, window: Duration) -> Self {
        let until = until.unwrap_or_else(now_millis);
        let mut range = Self::ending_at(until, window);
        if let Some(since) = since {
            range.since = since;
        }
        range
    }

    /// Whether the window contains no instant at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.since > self.until
    }

    /// Whether `time` falls inside the window.
    #[must_use]
    pub const fn contains(&self, time: i64) -> bool {
        time >= self.since && time <= self.until
    }

    /// Lower bound as a UTC instant.
    #[must_use]
    pub fn since_utc(&self) -> DateTime<Utc> {
        millis_to_utc(self.since)
    }

    /// Upper bound as a UTC instant.
    #[must_use]
    pub fn until_utc(&self) -> DateTime<Utc> {
        millis_to_utc(self.until)
    }
}

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_point_serializes_compactly() {
        let point = HistoryPoint::new(1_700_000_000_000, 74250.65);
        let json = serde_json::to_string(&point).unwrap();
        assert_eq!(json, r#"{"t":1700000000000,"p":74250.65}"#);
    }

    #[test]
    fn tick_to_point_keeps_time_and_price() {
        let tick = TickRecord {
            symbol: "BTC-USD".to_string(),
            price: 10.5,
            volume: DEFAULT_VOLUME,
            timestamp: 42,
        };
        assert_eq!(tick.to_point(), HistoryPoint::new(42, 10.5));
    }

    #[test]
    fn received_now_is_stamped_within_call() {
        let before = now_millis();
        let tick = TickRecord::received_now("ETH-USD".to_string(), 1.0, DEFAULT_VOLUME);
        let after = now_millis();
        assert!(tick.timestamp >= before && tick.timestamp <= after);
    }

    #[test]
    fn range_is_inclusive() {
        let range = TimeRange::new(10, 20);
        assert!(range.contains(10));
        assert!(range.contains(20));
        assert!(!range.contains(9));
        assert!(!range.contains(21));
    }

    #[test]
    fn default_window_spans_a_day() {
        let range = TimeRange::ending_at(100_000_000, DEFAULT_QUERY_WINDOW);
        assert_eq!(range.until - range.since, 86_400_000);
    }

    #[test]
    fn resolve_prefers_explicit_bounds() {
        let range = TimeRange::resolve(Some(5), Some(50), DEFAULT_QUERY_WINDOW);
        assert_eq!(range, TimeRange::new(5, 50));

        let range = TimeRange::resolve(None, Some(86_400_500), DEFAULT_QUERY_WINDOW);
        assert_eq!(range, TimeRange::new(500, 86_400_500));
    }

    #[test]
    fn inverted_range_is_empty() {
        assert!(TimeRange::new(20, 10).is_empty());
        assert!(!TimeRange::new(10, 10).is_empty());
    }
}
