//! Wire Frame Decoder
//!
//! Parses the text datagrams sent by price feeds:
//!
//! ```text
//! BTC-USD,74250.65
//! BTC-USD,74250.65,1.25
//! ```
//!
//! Surrounding whitespace is trimmed and the payload is split on commas.
//! Field 0 is the symbol (verbatim), field 1 the price, and the optional
//! field 2 the volume.

use crate::domain::tick::DEFAULT_VOLUME;

/// Largest datagram payload read from the socket.
pub const MAX_DATAGRAM_BYTES: usize = 1024;

/// What to do when the price field is not a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PricePolicy {
    /// Substitute `0.0` and keep the tick.
    #[default]
    Lenient,
    /// Discard the datagram.
    Strict,
}

impl PricePolicy {
    /// Parse policy from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "strict" => Self::Strict,
            _ => Self::Lenient,
        }
    }

    /// Get the policy name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lenient => "lenient",
            Self::Strict => "strict",
        }
    }
}

/// Reasons a datagram is discarded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Fewer than two comma-separated fields.
    #[error("expected at least 2 fields, got {fields}")]
    Undersized {
        /// Number of fields found.
        fields: usize,
    },

    /// The symbol field is empty.
    #[error("empty symbol")]
    EmptySymbol,

    /// The price field is not a number (strict policy only).
    #[error("invalid price: {raw:?}")]
    InvalidPrice {
        /// The raw price field.
        raw: String,
    },
}

impl FrameError {
    /// Metric label for this reason.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Undersized { .. } => "undersized",
            Self::EmptySymbol => "empty_symbol",
            Self::InvalidPrice { .. } => "invalid_price",
        }
    }
}

/// A decoded frame, not yet stamped with a receipt time.
#[derive(Debug, Clone, PartialEq)]
pub struct WireFrame {
    /// Instrument symbol.
    pub symbol: String,
    /// Price (0.0 when lenient parsing failed).
    pub price: f64,
    /// Volume (defaulted when absent).
    pub volume: f64,
}

/// Datagram decoder.
#[derive(Debug, Clone, Copy)]
pub struct WireDecoder {
    policy: PricePolicy,
    default_volume: f64,
}

impl Default for WireDecoder {
    fn default() -> Self {
        Self::new(PricePolicy::default())
    }
}

impl WireDecoder {
    /// Create a decoder with the given price policy.
    #[must_use]
    pub const fn new(policy: PricePolicy) -> Self {
        Self {
            policy,
            default_volume: DEFAULT_VOLUME,
        }
    }

    /// Decode one datagram payload.
    ///
    /// # Errors
    ///
    /// Returns `FrameError` if the datagram must be discarded.
    pub fn decode(&self, datagram: &[u8]) -> Result<WireFrame, FrameError> {
        let text = String::from_utf8_lossy(datagram);
        let fields: Vec<&str> = text.trim().split(',').collect();

        if fields.len() < 2 {
            return Err(FrameError::Undersized {
                fields: fields.len(),
            });
        }

        let symbol = fields[0];
        if symbol.is_empty() {
            return Err(FrameError::EmptySymbol);
        }

        // NaN and infinities parse but have no JSON or line-protocol form.
        let price = match (fields[1].parse::<f64>(), self.policy) {
            (Ok(price), _) if price.is_finite() => price,
            (_, PricePolicy::Lenient) => 0.0,
            (_, PricePolicy::Strict) => {
                return Err(FrameError::InvalidPrice {
                    raw: fields[1].to_string(),
                });
            }
        };

        let volume = fields
            .get(2)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(self.default_volume);

        Ok(WireFrame {
            symbol: symbol.to_string(),
            price,
            volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(b"BTC-USD,74250.65", "BTC-USD", 74250.65 ; "plain frame")]
    #[test_case(b"  ETH-USD,3100.5\n", "ETH-USD", 3100.5 ; "surrounding whitespace")]
    #[test_case(b"SOL-USD,-1.5", "SOL-USD", -1.5 ; "negative price kept")]
    #[test_case(b"btc/usd,1e3", "btc/usd", 1000.0 ; "symbol used verbatim")]
    #[test_case(b"DOGE-USD,0.0812,extra", "DOGE-USD", 0.0812 ; "unparsable volume defaults")]
    fn decodes_valid_frames(input: &[u8], symbol: &str, price: f64) {
        let frame = WireDecoder::default().decode(input).unwrap();
        assert_eq!(frame.symbol, symbol);
        assert_eq!(frame.price, price);
        assert_eq!(frame.volume, DEFAULT_VOLUME);
    }

    #[test_case(b"" ; "empty")]
    #[test_case(b"BTC-USD" ; "symbol only")]
    #[test_case(b"   \n" ; "whitespace only")]
    fn discards_undersized_frames(input: &[u8]) {
        let err = WireDecoder::default().decode(input).unwrap_err();
        assert!(matches!(err, FrameError::Undersized { fields: 1 }));
    }

    #[test]
    fn empty_symbol_is_discarded() {
        let err = WireDecoder::default().decode(b",100.0").unwrap_err();
        assert_eq!(err, FrameError::EmptySymbol);
    }

    #[test]
    fn lenient_policy_zeroes_bad_price() {
        let frame = WireDecoder::new(PricePolicy::Lenient)
            .decode(b"BTC-USD,abc")
            .unwrap();
        assert_eq!(frame.price, 0.0);
    }

    #[test]
    fn strict_policy_discards_bad_price() {
        let err = WireDecoder::new(PricePolicy::Strict)
            .decode(b"BTC-USD,abc")
            .unwrap_err();
        assert_eq!(
            err,
            FrameError::InvalidPrice {
                raw: "abc".to_string()
            }
        );
        assert_eq!(err.reason(), "invalid_price");
    }

    #[test_case(b"BTC-USD,NaN" ; "nan")]
    #[test_case(b"BTC-USD,inf" ; "inf")]
    #[test_case(b"BTC-USD,-infinity" ; "negative infinity")]
    fn lenient_policy_zeroes_non_finite_price(input: &[u8]) {
        let frame = WireDecoder::new(PricePolicy::Lenient).decode(input).unwrap();
        assert_eq!(frame.price, 0.0);
    }

    #[test_case(b"BTC-USD,NaN", "NaN" ; "nan")]
    #[test_case(b"BTC-USD,inf", "inf" ; "inf")]
    #[test_case(b"BTC-USD,-infinity", "-infinity" ; "negative infinity")]
    fn strict_policy_discards_non_finite_price(input: &[u8], raw: &str) {
        let err = WireDecoder::new(PricePolicy::Strict)
            .decode(input)
            .unwrap_err();
        assert_eq!(
            err,
            FrameError::InvalidPrice {
                raw: raw.to_string()
            }
        );
    }

    #[test]
    fn non_finite_volume_defaults() {
        let frame = WireDecoder::default().decode(b"BTC-USD,5.0,NaN").unwrap();
        assert_eq!(frame.volume, DEFAULT_VOLUME);
    }

    #[test]
    fn price_field_is_not_trimmed() {
        // Only the whole payload is trimmed; inner fields are taken as-is.
        let frame = WireDecoder::default().decode(b"BTC-USD, 5.0").unwrap();
        assert_eq!(frame.price, 0.0);
    }

    #[test]
    fn third_field_is_volume() {
        let frame = WireDecoder::default().decode(b"BTC-USD,5.0,12.5").unwrap();
        assert_eq!(frame.volume, 12.5);
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let frame = WireDecoder::default().decode(b"BT\xFFC,1.0").unwrap();
        assert_eq!(frame.symbol, "BT\u{FFFD}C");
    }

    #[test]
    fn policy_parsing() {
        assert_eq!(
            PricePolicy::from_str_case_insensitive("STRICT"),
            PricePolicy::Strict
        );
        assert_eq!(
            PricePolicy::from_str_case_insensitive("lenient"),
            PricePolicy::Lenient
        );
        assert_eq!(
            PricePolicy::from_str_case_insensitive("whatever"),
            PricePolicy::Lenient
        );
    }
}
