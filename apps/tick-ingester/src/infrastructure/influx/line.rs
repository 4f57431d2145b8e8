//! Line protocol encoding for ticks.

use crate::application::ports::SinkError;
use crate::domain::tick::TickRecord;

/// Measurement ticks are written to.
pub const MEASUREMENT: &str = "ticks";

/// Tag carrying the symbol.
pub const SYMBOL_TAG: &str = "symbol";

/// Field carrying the price.
pub const PRICE_FIELD: &str = "price";

/// Render one tick as a line protocol record with millisecond precision.
///
/// # Errors
///
/// Returns `SinkError::InvalidPoint` if the price is not finite, or the
/// symbol contains a line break or ends in a backslash.
pub fn tick_line(tick: &TickRecord) -> Result<String, SinkError> {
    if !tick.price.is_finite() {
        return Err(SinkError::InvalidPoint {
            reason: format!("non-finite price {}", tick.price),
        });
    }
    if tick.symbol.contains(['\n', '\r']) {
        return Err(SinkError::InvalidPoint {
            reason: "symbol contains a line break".to_string(),
        });
    }
    // A trailing backslash would escape the space before the field set.
    if tick.symbol.ends_with('\\') {
        return Err(SinkError::InvalidPoint {
            reason: "symbol ends in a backslash".to_string(),
        });
    }

    Ok(format!(
        "{MEASUREMENT},{SYMBOL_TAG}={} {PRICE_FIELD}={} {}",
        escape_tag(&tick.symbol),
        tick.price,
        tick.timestamp
    ))
}

/// Escape a tag value: commas, equals signs and spaces.
fn escape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(symbol: &str, price: f64) -> TickRecord {
        TickRecord {
            symbol: symbol.to_string(),
            price,
            volume: 500.0,
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn renders_measurement_tag_field_and_time() {
        assert_eq!(
            tick_line(&tick("BTC-USD", 74250.65)).unwrap(),
            "ticks,symbol=BTC-USD price=74250.65 1700000000000"
        );
    }

    #[test]
    fn integral_price_stays_a_float_field() {
        // No `i` suffix, so InfluxDB stores a float.
        assert_eq!(
            tick_line(&tick("ETH-USD", 3000.0)).unwrap(),
            "ticks,symbol=ETH-USD price=3000 1700000000000"
        );
    }

    #[test]
    fn special_characters_in_symbol_are_escaped() {
        assert_eq!(
            tick_line(&tick("A B=C", 1.5)).unwrap(),
            r"ticks,symbol=A\ B\=C price=1.5 1700000000000"
        );
    }

    #[test]
    fn non_finite_price_is_rejected() {
        for price in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = tick_line(&tick("BTC-USD", price)).unwrap_err();
            assert!(matches!(err, SinkError::InvalidPoint { .. }));
        }
    }

    #[test]
    fn line_break_in_symbol_is_rejected() {
        let err = tick_line(&tick("BTC\nUSD", 1.0)).unwrap_err();
        assert!(matches!(err, SinkError::InvalidPoint { .. }));
    }

    #[test]
    fn trailing_backslash_in_symbol_is_rejected() {
        let err = tick_line(&tick(r"ABC\", 1.0)).unwrap_err();
        assert!(matches!(err, SinkError::InvalidPoint { .. }));
    }

    #[test]
    fn inner_backslash_in_symbol_is_kept() {
        assert_eq!(
            tick_line(&tick(r"A\B", 1.0)).unwrap(),
            r"ticks,symbol=A\B price=1 1700000000000"
        );
    }
}
