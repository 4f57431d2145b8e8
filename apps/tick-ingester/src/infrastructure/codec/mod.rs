//! Tick Codecs
//!
//! Provides decoding and encoding for the two tick representations:
//!
//! - **Wire frames**: ASCII `SYMBOL,PRICE[,VOLUME]` datagrams from the feed
//! - **Envelopes**: protobuf-encoded `TickerUpdate` messages on the bus
//!
//! # Envelope Schema
//!
//! ```text
//! message TickerUpdate {
//!   string symbol    = 1;
//!   double price     = 2;
//!   double volume    = 3;
//!   int64  timestamp = 4;
//! }
//! ```

pub mod envelope;
pub mod wire;

pub use envelope::{
    CodecError, MAX_ENVELOPE_BYTES, TickerUpdate, decode_envelope, encode_envelope,
};
pub use wire::{FrameError, MAX_DATAGRAM_BYTES, PricePolicy, WireDecoder, WireFrame};
