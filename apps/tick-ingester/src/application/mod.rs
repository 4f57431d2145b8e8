//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that define how the pipeline interacts with buses and stores.

/// Port interfaces for external systems (bus, sinks, range sources).
pub mod ports;

/// Application services for bounded history and range reads.
pub mod services;
