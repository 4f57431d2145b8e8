//! Configuration Module
//!
//! Environment-driven configuration for the ingester.

mod settings;

pub use settings::{
    BusSettings, ConfigError, HistoryBackendKind, HistorySettings, IngestSettings,
    IngesterConfig, InfluxSettings, PersistSettings, QuerySource, ServerSettings,
};
