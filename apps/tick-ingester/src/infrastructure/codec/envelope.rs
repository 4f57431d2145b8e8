//! Bus Envelope Codec
//!
//! Ticks travel the bus as protobuf `TickerUpdate` messages. The message is
//! declared with `prost` derives so no build step is needed.

use bytes::{Bytes, BytesMut};
use prost::Message;

use crate::domain::tick::TickRecord;

/// Upper bound on an encoded envelope.
pub const MAX_ENVELOPE_BYTES: usize = 1024 * 1024;

/// Envelope codec error.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Protobuf encoding failed.
    #[error("encode failed: {0}")]
    Encode(#[from] prost::EncodeError),

    /// Protobuf decoding failed.
    #[error("decode failed: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Envelope exceeds [`MAX_ENVELOPE_BYTES`].
    #[error("envelope too large: {size} bytes (max {max})")]
    TooLarge {
        /// Encoded size.
        size: usize,
        /// Allowed size.
        max: usize,
    },

    /// Decoded envelope carries no symbol.
    #[error("envelope has no symbol")]
    MissingSymbol,
}

/// Protobuf tick envelope.
#[derive(Clone, PartialEq, Message)]
pub struct TickerUpdate {
    /// Instrument symbol.
    #[prost(string, tag = "1")]
    pub symbol: String,
    /// Price.
    #[prost(double, tag = "2")]
    pub price: f64,
    /// Volume.
    #[prost(double, tag = "3")]
    pub volume: f64,
    /// Epoch milliseconds.
    #[prost(int64, tag = "4")]
    pub timestamp: i64,
}

impl From<&TickRecord> for TickerUpdate {
    fn from(tick: &TickRecord) -> Self {
        Self {
            symbol: tick.symbol.clone(),
            price: tick.price,
            volume: tick.volume,
            timestamp: tick.timestamp,
        }
    }
}

impl From<TickerUpdate> for TickRecord {
    fn from(update: TickerUpdate) -> Self {
        Self {
            symbol: update.symbol,
            price: update.price,
            volume: update.volume,
            timestamp: update.timestamp,
        }
    }
}

/// Encode a tick into its bus envelope.
///
/// # Errors
///
/// Returns `CodecError::TooLarge` if the envelope would exceed
/// [`MAX_ENVELOPE_BYTES`], or `CodecError::Encode` on buffer exhaustion.
pub fn encode_envelope(tick: &TickRecord) -> Result<Bytes, CodecError> {
    let update = TickerUpdate::from(tick);
    let size = update.encoded_len();
    if size > MAX_ENVELOPE_BYTES {
        return Err(CodecError::TooLarge {
            size,
            max: MAX_ENVELOPE_BYTES,
        });
    }

    let mut buf = BytesMut::with_capacity(size);
    update.encode(&mut buf)?;
    Ok(buf.freeze())
}

/// Decode a bus envelope back into a tick.
///
/// # Errors
///
/// Returns `CodecError::Decode` for malformed protobuf, or
/// `CodecError::MissingSymbol` if the symbol field is empty.
pub fn decode_envelope(bytes: &[u8]) -> Result<TickRecord, CodecError> {
    let update = TickerUpdate::decode(bytes)?;
    if update.symbol.is_empty() {
        return Err(CodecError::MissingSymbol);
    }
    Ok(update.into())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::domain::tick::{DEFAULT_VOLUME, now_millis};
    use crate::infrastructure::codec::WireDecoder;

    fn tick(symbol: &str, price: f64) -> TickRecord {
        TickRecord {
            symbol: symbol.to_string(),
            price,
            volume: 500.0,
            timestamp: 1_700_000_000_123,
        }
    }

    #[test]
    fn envelope_carries_all_fields() {
        let bytes = encode_envelope(&tick("BTC-USD", 74250.65)).unwrap();
        let update = TickerUpdate::decode(bytes.as_ref()).unwrap();
        assert_eq!(update.symbol, "BTC-USD");
        assert_eq!(update.price, 74250.65);
        assert_eq!(update.volume, 500.0);
        assert_eq!(update.timestamp, 1_700_000_000_123);
    }

    #[test]
    fn field_tags_match_schema() {
        // symbol=1 (len-delimited), price=2 (fixed64)
        let bytes = encode_envelope(&tick("A", 1.0)).unwrap();
        assert_eq!(bytes[0], 0x0A);
        assert_eq!(bytes[1], 1);
        assert_eq!(bytes[2], b'A');
        assert_eq!(bytes[3], 0x11);
    }

    #[test]
    fn oversized_symbol_is_rejected() {
        let huge = "X".repeat(MAX_ENVELOPE_BYTES + 1);
        let err = encode_envelope(&tick(&huge, 1.0)).unwrap_err();
        assert!(matches!(err, CodecError::TooLarge { .. }));
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = decode_envelope(&[0xFF, 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn empty_envelope_has_no_symbol() {
        let err = decode_envelope(&[]).unwrap_err();
        assert!(matches!(err, CodecError::MissingSymbol));
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            symbol in "[A-Z]{2,6}-[A-Z]{3}",
            price in -1.0e9f64..1.0e9,
            volume in 0.0f64..1.0e6,
            timestamp in 0i64..4_102_444_800_000,
        ) {
            let original = TickRecord { symbol, price, volume, timestamp };
            let bytes = encode_envelope(&original).unwrap();
            prop_assert_eq!(decode_envelope(&bytes).unwrap(), original);
        }

        #[test]
        fn wire_text_survives_the_bus(
            symbol in "[A-Za-z0-9./:-]{1,12}",
            price in -1.0e9f64..1.0e9,
        ) {
            let datagram = format!("{symbol},{price}");

            let before = now_millis();
            let frame = WireDecoder::default().decode(datagram.as_bytes()).unwrap();
            let tick = TickRecord::received_now(frame.symbol, frame.price, frame.volume);
            let after = now_millis();

            let received = decode_envelope(&encode_envelope(&tick).unwrap()).unwrap();
            prop_assert_eq!(&received.symbol, &symbol);
            prop_assert_eq!(received.price, price);
            prop_assert_eq!(received.volume, DEFAULT_VOLUME);
            prop_assert!(before <= received.timestamp && received.timestamp <= after);
        }
    }
}
