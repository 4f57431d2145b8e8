//! History Retention
//!
//! Per-symbol history is an arrival-ordered log of [`HistoryPoint`]s
//! capped at [`HISTORY_CAPACITY`] entries. Appending past the cap evicts
//! the oldest entries first.

use super::tick::{HistoryPoint, TimeRange};

/// Maximum number of points retained per symbol.
pub const HISTORY_CAPACITY: usize = 200;

/// Append `point` to `log` and evict from the head until at most
/// `capacity` entries remain.
///
/// Returns the number of evicted points.
pub fn append_bounded(log: &mut Vec<HistoryPoint>, point: HistoryPoint, capacity: usize) -> usize {
    log.push(point);
    let excess = log.len().saturating_sub(capacity);
    if excess > 0 {
        log.drain(..excess);
    }
    excess
}

/// Points of `log` inside `range`, ascending by time.
///
/// The log is kept in arrival order, so the filtered slice is stable-sorted;
/// points sharing a timestamp keep their arrival order.
#[must_use]
pub fn points_in_range(log: &[HistoryPoint], range: TimeRange) -> Vec<HistoryPoint> {
    if range.is_empty() {
        return Vec::new();
    }
    let mut points: Vec<HistoryPoint> = log
        .iter()
        .copied()
        .filter(|p| range.contains(p.time))
        .collect();
    points.sort_by_key(|p| p.time);
    points
}
