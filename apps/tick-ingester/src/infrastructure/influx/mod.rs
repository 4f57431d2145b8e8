//! InfluxDB Adapter
//!
//! Writes ticks to and reads price history from an InfluxDB v2 server
//! over its HTTP API.
//!
//! # Data Layout
//!
//! ```text
//! ticks,symbol=BTC-USD price=74250.65 1700000000000
//! ^     ^              ^              ^
//! |     tag            field          timestamp (ms)
//! measurement
//! ```
//!
//! # Endpoints
//!
//! - `POST /api/v2/write`: line protocol writes (`precision=ms`)
//! - `POST /api/v2/query`: Flux range reads, CSV response
//! - `GET /health`: startup reachability probe

mod client;
mod flux;
mod line;

use std::time::Duration;

pub use client::{InfluxClient, InfluxClientError};
pub use flux::{parse_csv_points, range_query};
pub use line::{MEASUREMENT, PRICE_FIELD, SYMBOL_TAG, tick_line};

/// InfluxDB connection settings.
#[derive(Clone)]
pub struct InfluxConfig {
    /// Server base URL.
    pub url: String,
    /// API token.
    pub token: String,
    /// Organization.
    pub org: String,
    /// Bucket ticks are written to and read from.
    pub bucket: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            token: "ticker-secret-token".to_string(),
            org: "ticker".to_string(),
            bucket: "ticks".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl std::fmt::Debug for InfluxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxConfig")
            .field("url", &self.url)
            .field("token", &"[REDACTED]")
            .field("org", &self.org)
            .field("bucket", &self.bucket)
            .field("timeout", &self.timeout)
            .finish()
    }
}
