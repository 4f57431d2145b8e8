//! InfluxDB HTTP client.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use super::InfluxConfig;
use super::flux::{parse_csv_points, range_query};
use super::line::tick_line;
use crate::application::ports::{RangeSource, SinkError, SourceError, TickSink};
use crate::domain::tick::{HistoryPoint, TickRecord, TimeRange};
use crate::infrastructure::metrics::set_influx_reachable;

/// Errors building the client.
#[derive(Debug, thiserror::Error)]
pub enum InfluxClientError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

/// InfluxDB v2 client.
///
/// Implements `TickSink` (one write per tick) and `RangeSource`
/// (Flux range reads).
#[derive(Debug, Clone)]
pub struct InfluxClient {
    http: reqwest::Client,
    config: InfluxConfig,
}

impl InfluxClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `InfluxClientError::Build` if the HTTP client cannot be built.
    pub fn new(config: InfluxConfig) -> Result<Self, InfluxClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| InfluxClientError::Build(e.to_string()))?;

        Ok(Self { http, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.url.trim_end_matches('/'))
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.config.token)
    }

    /// Write one tick.
    ///
    /// # Errors
    ///
    /// - `SinkError::InvalidPoint` if the tick cannot be encoded.
    /// - `SinkError::Unreachable` if the request fails.
    /// - `SinkError::Rejected` if the server answers with a non-success status.
    pub async fn write(&self, tick: &TickRecord) -> Result<(), SinkError> {
        let line = tick_line(tick)?;

        let response = self
            .http
            .post(self.endpoint("/api/v2/write"))
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", self.config.bucket.as_str()),
                ("precision", "ms"),
            ])
            .header("Authorization", self.auth_header())
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(line)
            .send()
            .await
            .map_err(|e| SinkError::Unreachable {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected { status, body });
        }
        Ok(())
    }

    /// Read `symbol`'s price points inside `range`.
    ///
    /// # Errors
    ///
    /// - `SourceError::Connection` if the request fails.
    /// - `SourceError::Rejected` if the server answers with a non-success status.
    /// - `SourceError::Malformed` if the response cannot be parsed.
    pub async fn query_range(
        &self,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<HistoryPoint>, SourceError> {
        let body = serde_json::json!({
            "query": range_query(&self.config.bucket, symbol, range),
            "type": "flux",
            "dialect": {
                "header": true,
                "annotations": [],
                "delimiter": ",",
            },
        });

        let response = self
            .http
            .post(self.endpoint("/api/v2/query"))
            .query(&[("org", self.config.org.as_str())])
            .header("Authorization", self.auth_header())
            .header("Accept", "application/csv")
            .json(&body)
            .send()
            .await
            .map_err(|e| SourceError::Connection {
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| SourceError::Connection {
            message: e.to_string(),
        })?;
        if !status.is_success() {
            return Err(SourceError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_csv_points(&text)
    }

    /// Check whether the server answers its health endpoint.
    pub async fn probe(&self) -> bool {
        match self.http.get(self.endpoint("/health")).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(
                    url = %self.config.url,
                    status = response.status().as_u16(),
                    "InfluxDB health check returned non-success"
                );
                false
            }
            Err(e) => {
                tracing::warn!(url = %self.config.url, error = %e, "InfluxDB unreachable");
                false
            }
        }
    }

    /// Probe the server once in the background and log the result.
    ///
    /// The outcome never blocks or fails startup.
    #[must_use]
    pub fn spawn_probe(self: &Arc<Self>) -> JoinHandle<bool> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let reachable = client.probe().await;
            set_influx_reachable(reachable);
            if reachable {
                tracing::info!(url = %client.config.url, "InfluxDB reachable");
            }
            reachable
        })
    }
}

#[async_trait]
impl TickSink for InfluxClient {
    fn name(&self) -> &'static str {
        "influx"
    }

    async fn persist(&self, tick: &TickRecord) -> Result<(), SinkError> {
        self.write(tick).await
    }
}

#[async_trait]
impl RangeSource for InfluxClient {
    async fn points_between(
        &self,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<HistoryPoint>, SourceError> {
        self.query_range(symbol, range).await
    }

    fn name(&self) -> &'static str {
        "influx"
    }
}

// =============================================================================
// Tests
// =============================================================================
