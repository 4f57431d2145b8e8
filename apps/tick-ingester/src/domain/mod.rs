//! Domain Layer - Core tick types and retention rules.
//!
//! This layer contains the core domain types for price ticks with no
//! I/O. All types here are pure Rust with serialization support.

/// Tick records, history points and time windows.
pub mod tick;

/// Bounded per-symbol history retention.
pub mod history;
