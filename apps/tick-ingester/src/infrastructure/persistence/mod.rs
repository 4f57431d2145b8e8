//! Persistence Adapters
//!
//! Storage implementations of [`HistoryBackend`](crate::application::ports::HistoryBackend).

pub mod file;
pub mod in_memory;

pub use file::FileHistoryBackend;
pub use in_memory::InMemoryHistoryBackend;
