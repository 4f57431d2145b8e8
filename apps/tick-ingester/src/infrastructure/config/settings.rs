//! Ingester Configuration Settings
//!
//! Configuration types for the tick ingester, loaded from environment
//! variables. Unset or empty variables fall back to the defaults below.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::infrastructure::codec::PricePolicy;
use crate::infrastructure::influx::InfluxConfig;
use crate::infrastructure::ingest::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS, PoolConfig};

/// History backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryBackendKind {
    /// Process-local map.
    #[default]
    Memory,
    /// One JSON file per symbol.
    File,
    /// No history store.
    Disabled,
}

impl HistoryBackendKind {
    /// Parse backend kind from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "file" => Some(Self::File),
            "disabled" | "none" | "off" => Some(Self::Disabled),
            _ => None,
        }
    }

    /// Get the backend name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Disabled => "disabled",
        }
    }
}

/// Where range queries are answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuerySource {
    /// InfluxDB Flux queries.
    #[default]
    Influx,
    /// The bounded history store.
    History,
}

impl QuerySource {
    /// Parse query source from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "influx" | "influxdb" => Some(Self::Influx),
            "history" => Some(Self::History),
            _ => None,
        }
    }

    /// Get the source name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Influx => "influx",
            Self::History => "history",
        }
    }
}

/// Datagram socket settings.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Bind address.
    pub bind_addr: IpAddr,
    /// UDP port.
    pub udp_port: u16,
    /// Price parse policy.
    pub price_policy: PricePolicy,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            udp_port: 5005,
            price_policy: PricePolicy::Lenient,
        }
    }
}

impl IngestSettings {
    /// Socket address to bind.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.udp_port)
    }
}

/// Message bus settings.
#[derive(Debug, Clone)]
pub struct BusSettings {
    /// NATS server URL.
    pub nats_url: String,
    /// Subject envelopes are published on.
    pub subject: String,
    /// Outbound queue capacity.
    pub queue_capacity: usize,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            nats_url: "nats://localhost:4222".to_string(),
            subject: "market.ticks".to_string(),
            queue_capacity: 4096,
        }
    }
}

/// InfluxDB settings.
#[derive(Clone)]
pub struct InfluxSettings {
    /// Whether ticks are written to InfluxDB.
    pub enabled: bool,
    /// Connection settings.
    pub connection: InfluxConfig,
}

impl Default for InfluxSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            connection: InfluxConfig::default(),
        }
    }
}

impl std::fmt::Debug for InfluxSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxSettings")
            .field("enabled", &self.enabled)
            .field("connection", &self.connection)
            .finish()
    }
}

/// History store settings.
#[derive(Debug, Clone)]
pub struct HistorySettings {
    /// Backend kind.
    pub backend: HistoryBackendKind,
    /// Directory for the file backend.
    pub dir: PathBuf,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            backend: HistoryBackendKind::Memory,
            dir: PathBuf::from("history"),
        }
    }
}

/// Persistence pool settings.
#[derive(Debug, Clone, Copy)]
pub struct PersistSettings {
    /// Number of workers.
    pub workers: usize,
    /// Queue capacity per worker.
    pub queue_capacity: usize,
}

impl Default for PersistSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl From<PersistSettings> for PoolConfig {
    fn from(settings: PersistSettings) -> Self {
        Self {
            workers: settings.workers,
            queue_capacity: settings.queue_capacity,
        }
    }
}

/// Read API server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// HTTP port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 8090 }
    }
}

/// Complete ingester configuration.
#[derive(Debug, Clone, Default)]
pub struct IngesterConfig {
    /// Datagram socket settings.
    pub ingest: IngestSettings,
    /// Message bus settings.
    pub bus: BusSettings,
    /// InfluxDB settings.
    pub influx: InfluxSettings,
    /// History store settings.
    pub history: HistorySettings,
    /// Persistence pool settings.
    pub persist: PersistSettings,
    /// Read API server settings.
    pub server: ServerSettings,
    /// Effective range query source.
    pub query_source: QuerySource,
}

impl IngesterConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an unusable value or the
    /// selected sources contradict each other.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let defaults = Self::default();

        let ingest = IngestSettings {
            bind_addr: env.parse_required("INGEST_BIND_ADDR", defaults.ingest.bind_addr)?,
            udp_port: env.parse_or("INGEST_UDP_PORT", defaults.ingest.udp_port),
            price_policy: env
                .get("INGEST_PRICE_POLICY")
                .map_or(defaults.ingest.price_policy, |s| {
                    PricePolicy::from_str_case_insensitive(&s)
                }),
        };

        let bus = BusSettings {
            nats_url: env.string_or("NATS_URL", &defaults.bus.nats_url),
            subject: env.string_or("NATS_SUBJECT", &defaults.bus.subject),
            queue_capacity: env.parse_or(
                "NATS_PUBLISH_QUEUE_CAPACITY",
                defaults.bus.queue_capacity,
            ),
        };

        let influx_defaults = &defaults.influx.connection;
        let influx = InfluxSettings {
            enabled: env.bool_or("INFLUXDB_ENABLED", defaults.influx.enabled),
            connection: InfluxConfig {
                url: env.string_or("INFLUXDB_URL", &influx_defaults.url),
                token: env.string_or("INFLUXDB_TOKEN", &influx_defaults.token),
                org: env.string_or("INFLUXDB_ORG", &influx_defaults.org),
                bucket: env.string_or("INFLUXDB_BUCKET", &influx_defaults.bucket),
                timeout: env.millis_or("INFLUXDB_TIMEOUT_MS", influx_defaults.timeout),
            },
        };

        let history = HistorySettings {
            backend: env.choice(
                "HISTORY_BACKEND",
                defaults.history.backend,
                HistoryBackendKind::parse,
            )?,
            dir: env
                .get("HISTORY_DIR")
                .map_or(defaults.history.dir, PathBuf::from),
        };

        let persist = PersistSettings {
            workers: env.parse_or("PERSIST_WORKERS", defaults.persist.workers),
            queue_capacity: env.parse_or(
                "PERSIST_QUEUE_CAPACITY",
                defaults.persist.queue_capacity,
            ),
        };

        let server = ServerSettings {
            port: env.parse_or("PORT", defaults.server.port),
        };

        let requested = env.choice("QUERY_SOURCE", defaults.query_source, QuerySource::parse)?;
        let query_source = resolve_query_source(requested, influx.enabled, history.backend)?;

        Ok(Self {
            ingest,
            bus,
            influx,
            history,
            persist,
            server,
            query_source,
        })
    }
}

fn resolve_query_source(
    requested: QuerySource,
    influx_enabled: bool,
    history: HistoryBackendKind,
) -> Result<QuerySource, ConfigError> {
    let history_enabled = history != HistoryBackendKind::Disabled;
    match requested {
        QuerySource::Influx if influx_enabled => Ok(QuerySource::Influx),
        QuerySource::Influx if history_enabled => {
            tracing::warn!("QUERY_SOURCE=influx but InfluxDB is disabled; using history");
            Ok(QuerySource::History)
        }
        QuerySource::History if history_enabled => Ok(QuerySource::History),
        QuerySource::Influx => Err(ConfigError::Conflict(
            "no query source: InfluxDB and history are both disabled".to_string(),
        )),
        QuerySource::History => Err(ConfigError::Conflict(
            "QUERY_SOURCE=history requires HISTORY_BACKEND other than disabled".to_string(),
        )),
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable holds an unusable value.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },
    /// Settings contradict each other.
    #[error("conflicting configuration: {0}")]
    Conflict(String),
}

/// Typed access to a key lookup; empty values count as unset.
struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_required<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: v,
            }),
        }
    }

    fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).map_or(default, |v| {
            matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
        })
    }

    fn millis_or(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(default, Duration::from_millis)
    }

    fn choice<T>(
        &self,
        key: &str,
        default: T,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => parse(&v).ok_or(ConfigError::InvalidValue {
                key: key.to_string(),
                value: v,
            }),
        }
    }
}
