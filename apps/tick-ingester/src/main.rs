//! Tick Ingester Binary
//!
//! Starts the datagram receiver, persistence workers and read API.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin tick-ingester
//! ```
//!
//! # Environment Variables
//!
//! - `INGEST_BIND_ADDR`: Datagram bind address (default: 0.0.0.0)
//! - `INGEST_UDP_PORT`: Datagram port (default: 5005)
//! - `INGEST_PRICE_POLICY`: lenient | strict (default: lenient)
//! - `NATS_URL`: NATS server (default: <nats://localhost:4222>)
//! - `NATS_SUBJECT`: Envelope subject (default: market.ticks)
//! - `NATS_PUBLISH_QUEUE_CAPACITY`: Outbound queue size (default: 4096)
//! - `INFLUXDB_ENABLED`: Write ticks to InfluxDB (default: true)
//! - `INFLUXDB_URL`, `INFLUXDB_TOKEN`, `INFLUXDB_ORG`, `INFLUXDB_BUCKET`
//! - `INFLUXDB_TIMEOUT_MS`: Request timeout (default: 5000)
//! - `HISTORY_BACKEND`: memory | file | disabled (default: memory)
//! - `HISTORY_DIR`: Directory for the file backend (default: history)
//! - `PERSIST_WORKERS`: Persistence workers (default: 4)
//! - `PERSIST_QUEUE_CAPACITY`: Per-worker queue size (default: 1024)
//! - `QUERY_SOURCE`: influx | history (default: influx)
//! - `PORT`: Read API port (default: 8090)
//! - `OTEL_ENABLED`: Enable OpenTelemetry export (default: false)
//! - `RUST_LOG`: Log filter (default: tick_ingester=info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tick_ingester::application::ports::{HistoryBackend, RangeSource, TickPublisher, TickSink};
use tick_ingester::infrastructure::api::{ApiServer, ApiState};
use tick_ingester::infrastructure::config::{HistoryBackendKind, IngesterConfig, QuerySource};
use tick_ingester::infrastructure::ingest::{
    DatagramReceiver, IngestPipeline, IngestStats, PersistencePool,
};
use tick_ingester::infrastructure::persistence::{FileHistoryBackend, InMemoryHistoryBackend};
use tick_ingester::infrastructure::telemetry;
use tick_ingester::{
    HistoryStore, InfluxClient, NatsPublisher, NatsPublisherConfig, RangeQueryService,
    WireDecoder, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let _telemetry_guard = telemetry::init().context("failed to initialize telemetry")?;

    tracing::info!("Starting tick ingester");

    let _metrics_handle = init_metrics().context("failed to install metrics recorder")?;

    let config = IngesterConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // History store
    let history = match config.history.backend {
        HistoryBackendKind::Memory => {
            let backend: Arc<dyn HistoryBackend> = Arc::new(InMemoryHistoryBackend::new());
            Some(Arc::new(HistoryStore::new(backend)))
        }
        HistoryBackendKind::File => {
            let backend = FileHistoryBackend::open(config.history.dir.clone())
                .await
                .with_context(|| {
                    format!("failed to open history dir {}", config.history.dir.display())
                })?;
            Some(Arc::new(HistoryStore::new(Arc::new(backend))))
        }
        HistoryBackendKind::Disabled => None,
    };

    // InfluxDB
    let influx = if config.influx.enabled {
        let client = Arc::new(
            InfluxClient::new(config.influx.connection.clone())
                .context("failed to build InfluxDB client")?,
        );
        drop(client.spawn_probe());
        Some(client)
    } else {
        None
    };

    // Message bus
    let publisher = Arc::new(
        NatsPublisher::connect(NatsPublisherConfig {
            url: config.bus.nats_url.clone(),
            subject: config.bus.subject.clone(),
            queue_capacity: config.bus.queue_capacity,
            ..NatsPublisherConfig::default()
        })
        .await
        .context("message bus unavailable")?,
    );

    // Persistence workers
    let mut sinks: Vec<Arc<dyn TickSink>> = Vec::new();
    if let Some(store) = &history {
        sinks.push(Arc::clone(store) as Arc<dyn TickSink>);
    }
    if let Some(client) = &influx {
        sinks.push(Arc::clone(client) as Arc<dyn TickSink>);
    }
    let pool = Arc::new(PersistencePool::spawn(sinks, config.persist.into()));

    // Ingestion
    let stats = Arc::new(IngestStats::new());
    let pipeline = Arc::new(IngestPipeline::new(
        WireDecoder::new(config.ingest.price_policy),
        Arc::clone(&publisher) as Arc<dyn TickPublisher>,
        Arc::clone(&pool),
        Arc::clone(&stats),
    ));
    let receiver = DatagramReceiver::bind(config.ingest.socket_addr(), pipeline)
        .await
        .context("ingestion socket unavailable")?;
    let receiver_task = tokio::spawn(receiver.run(shutdown_token.clone()));

    // Read API
    let source: Option<Arc<dyn RangeSource>> = match config.query_source {
        QuerySource::Influx => influx.clone().map(|c| c as Arc<dyn RangeSource>),
        QuerySource::History => history.clone().map(|s| s as Arc<dyn RangeSource>),
    };
    let source = source.context("no range source available")?;
    let api_state = Arc::new(ApiState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        RangeQueryService::new(source),
        Arc::clone(&stats),
        pool.sink_names().to_vec(),
    ));
    let api_server = ApiServer::new(config.server.port, api_state, shutdown_token.clone());
    let api_task = tokio::spawn(async move {
        if let Err(e) = api_server.run().await {
            tracing::error!(error = %e, "Read API error");
        }
    });

    tracing::info!("Tick ingester ready");

    await_shutdown(shutdown_token).await;

    let drained = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        if let Err(e) = receiver_task.await {
            tracing::error!(error = %e, "Receiver task failed");
        }
        pool.drain().await;
        publisher.close().await;
        if let Err(e) = api_task.await {
            tracing::error!(error = %e, "Read API task failed");
        }
    })
    .await;

    if drained.is_err() {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Graceful shutdown timed out"
        );
    }

    tracing::info!("Tick ingester stopped");
    Ok(())
}

/// Load environment variables from .env file if present.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Load .env file from any ancestor directory.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &IngesterConfig) {
    tracing::info!(
        udp = %config.ingest.socket_addr(),
        price_policy = config.ingest.price_policy.as_str(),
        subject = %config.bus.subject,
        history = config.history.backend.as_str(),
        influx = config.influx.enabled,
        query_source = config.query_source.as_str(),
        api_port = config.server.port,
        "Configuration loaded"
    );
    tracing::debug!(
        nats_url = %config.bus.nats_url,
        influx = ?config.influx.connection,
        "Endpoints"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
