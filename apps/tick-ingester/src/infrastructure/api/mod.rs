//! Read API
//!
//! HTTP surface for history reads, health checks and Prometheus metrics.
//!
//! # Endpoints
//!
//! - `GET /history/{symbol}` - Points for a symbol, ascending by time
//! - `GET /api/history/{symbol}` - Alias of the above
//! - `GET /health` - JSON health status with ingest counters
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /readyz` - Readiness probe (ingestion socket bound)
//! - `GET /metrics` - Prometheus metrics in text format
//!
//! History routes accept optional `since` and `until` query parameters in
//! epoch milliseconds. Every response carries permissive read-only CORS
//! headers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::application::services::{QueryError, RangeQueryService};
use crate::infrastructure::ingest::{IngestSnapshot, IngestStats};
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" while the ingestion socket is bound, "unhealthy" otherwise.
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Ingestion counters.
    pub ingest: IngestSnapshot,
    /// Enabled persistence sinks.
    pub sinks: Vec<&'static str>,
    /// Source answering history reads.
    pub query_source: &'static str,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Receiving datagrams.
    Healthy,
    /// Ingestion socket not bound.
    Unhealthy,
}

/// Optional history window bounds.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct HistoryParams {
    /// Inclusive lower bound (epoch ms).
    pub since: Option<i64>,
    /// Inclusive upper bound (epoch ms).
    pub until: Option<i64>,
}

// =============================================================================
// Server State
// =============================================================================

/// Shared state for the read API.
pub struct ApiState {
    version: String,
    started_at: Instant,
    query: RangeQueryService,
    stats: Arc<IngestStats>,
    sinks: Vec<&'static str>,
}

impl ApiState {
    /// Create API state.
    #[must_use]
    pub fn new(
        version: String,
        query: RangeQueryService,
        stats: Arc<IngestStats>,
        sinks: Vec<&'static str>,
    ) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            query,
            stats,
            sinks,
        }
    }

    fn health(&self) -> HealthResponse {
        let ingest = self.stats.snapshot();
        HealthResponse {
            status: if ingest.socket_bound {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            version: self.version.clone(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            current_time: Utc::now(),
            ingest,
            sinks: self.sinks.clone(),
            query_source: self.query.source_name(),
        }
    }
}

impl std::fmt::Debug for ApiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiState")
            .field("version", &self.version)
            .field("query", &self.query)
            .field("sinks", &self.sinks)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Router
// =============================================================================

/// Build the API router with CORS and request tracing applied.
#[must_use]
pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/history", get(missing_symbol_handler))
        .route("/history/", get(missing_symbol_handler))
        .route("/history/{symbol}", get(history_handler))
        .route("/api/history", get(missing_symbol_handler))
        .route("/api/history/", get(missing_symbol_handler))
        .route("/api/history/{symbol}", get(history_handler))
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// =============================================================================
// Server
// =============================================================================

/// Read API HTTP server.
#[derive(Debug)]
pub struct ApiServer {
    port: u16,
    state: Arc<ApiState>,
    cancel: CancellationToken,
}

impl ApiServer {
    /// Create a new API server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<ApiState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ApiServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), ApiServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ApiServerError::BindFailed(self.port, e.to_string()))?;

        self.serve(listener).await
    }

    /// Serve on an already bound listener until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ApiServerError::ServerFailed` on a fatal server error.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ApiServerError> {
        let local = listener.local_addr().ok();
        tracing::info!(addr = ?local, "Read API listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| ApiServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Read API stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        match self {
            Self::EmptySymbol => (StatusCode::BAD_REQUEST, "Missing symbol").into_response(),
            Self::QueryFailed => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Query failed").into_response()
            }
        }
    }
}

async fn history_handler(
    State(state): State<Arc<ApiState>>,
    Path(symbol): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, QueryError> {
    let points = state
        .query
        .query(&symbol, params.since, params.until)
        .await?;
    Ok(Json(points))
}

async fn missing_symbol_handler() -> QueryError {
    QueryError::EmptySymbol
}

async fn health_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let response = state.health();
    let status_code = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    if state.stats.is_bound() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

// =============================================================================
// Errors
// =============================================================================

/// Read API server errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::application::ports::{MockRangeSource, SourceError};
    use crate::domain::tick::HistoryPoint;

    fn state_with(source: MockRangeSource) -> Arc<ApiState> {
        Arc::new(ApiState::new(
            "test".to_string(),
            RangeQueryService::new(Arc::new(source)),
            Arc::new(IngestStats::new()),
            vec!["history"],
        ))
    }

    fn source_returning(points: Vec<HistoryPoint>) -> MockRangeSource {
        let mut source = MockRangeSource::new();
        source.expect_name().return_const("history");
        source
            .expect_points_between()
            .returning(move |_, _| Ok(points.clone()));
        source
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }

    #[tokio::test]
    async fn history_returns_points_as_t_and_p() {
        let now = crate::domain::tick::now_millis();
        let app = router(state_with(source_returning(vec![HistoryPoint {
            time: now - 10,
            price: 74250.65,
        }])));

        let (status, body) = get(app, "/history/BTC-USD").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json, serde_json::json!([{ "t": now - 10, "p": 74250.65 }]));
    }

    #[tokio::test]
    async fn api_alias_serves_the_same_route() {
        let app = router(state_with(source_returning(Vec::new())));
        let (status, body) = get(app, "/api/history/ETH-USD").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn empty_segment_is_bad_request() {
        for uri in ["/history/", "/history", "/api/history/"] {
            let app = router(state_with(MockRangeSource::new()));
            let (status, body) = get(app, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body, "Missing symbol");
        }
    }

    #[tokio::test]
    async fn source_failure_is_opaque_500() {
        let mut source = MockRangeSource::new();
        source.expect_name().return_const("influx");
        source.expect_points_between().returning(|_, _| {
            Err(SourceError::Connection {
                message: "connection refused".to_string(),
            })
        });

        let (status, body) = get(router(state_with(source)), "/history/BTC-USD").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Query failed");
    }

    #[tokio::test]
    async fn window_parameters_are_forwarded() {
        let mut source = MockRangeSource::new();
        source.expect_name().return_const("history");
        source
            .expect_points_between()
            .withf(|symbol, range| symbol == "BTC-USD" && range.since == 1_000 && range.until == 2_000)
            .times(1)
            .returning(|_, _| Ok(vec![HistoryPoint { time: 1_500, price: 1.0 }]));

        let (status, body) = get(
            router(state_with(source)),
            "/history/BTC-USD?since=1000&until=2000",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"[{"t":1500,"p":1.0}]"#);
    }

    #[tokio::test]
    async fn health_is_unhealthy_until_socket_bound() {
        let state = state_with(source_returning(Vec::new()));
        let (status, body) = get(router(Arc::clone(&state)), "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("\"unhealthy\""));

        state.stats.set_bound("127.0.0.1:5001".parse().unwrap());
        let (status, body) = get(router(Arc::clone(&state)), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"healthy\""));
        assert!(body.contains("\"history\""));

        let (status, body) = get(router(state), "/readyz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "READY");
    }

    #[tokio::test]
    async fn liveness_is_always_ok() {
        let (status, body) = get(router(state_with(MockRangeSource::new())), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn responses_carry_cors_header() {
        let app = router(state_with(source_returning(Vec::new())));
        let response = app
            .oneshot(
                Request::get("/history/BTC-USD")
                    .header(header::ORIGIN, "http://dashboard.local")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }
}
