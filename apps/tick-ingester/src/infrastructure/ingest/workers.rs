//! Persistence Worker Pool
//!
//! Fans accepted ticks out to every configured [`TickSink`] off the
//! ingestion path.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─▶ [queue 0] ─▶ worker 0 ─┬─▶ history
//! dispatch(tick) ────┼─▶ [queue 1] ─▶ worker 1  ├─▶ influx
//!   hash(symbol)     └─▶ [queue N] ─▶ worker N ─┘
//! ```
//!
//! Ticks for one symbol always land on the same worker, so per-symbol write
//! order matches dispatch order. A worker writes to all sinks concurrently
//! and one failing sink never affects another. A full queue drops the tick
//! for persistence only.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::ports::TickSink;
use crate::domain::tick::TickRecord;
use crate::infrastructure::metrics::{WriteOutcome, record_sink_write};

/// Default number of workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Default per-worker queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Dispatch error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The target worker's queue is full.
    #[error("persistence queue full")]
    QueueFull,

    /// The pool has been drained.
    #[error("persistence pool closed")]
    Closed,
}

/// Pool sizing.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Number of workers.
    pub workers: usize,
    /// Queue capacity per worker.
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Symbol-sharded persistence workers.
pub struct PersistencePool {
    senders: RwLock<Vec<mpsc::Sender<TickRecord>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    sink_names: Vec<&'static str>,
}

impl PersistencePool {
    /// Spawn the workers. Must be called within a tokio runtime.
    #[must_use]
    pub fn spawn(sinks: Vec<Arc<dyn TickSink>>, config: PoolConfig) -> Self {
        let sink_names = sinks.iter().map(|s| s.name()).collect();
        let sinks: Arc<[Arc<dyn TickSink>]> = sinks.into();

        let worker_count = config.workers.max(1);
        let mut senders = Vec::with_capacity(worker_count);
        let mut workers = Vec::with_capacity(worker_count);

        for id in 0..worker_count {
            let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
            senders.push(tx);
            workers.push(tokio::spawn(run_worker(id, Arc::clone(&sinks), rx)));
        }

        tracing::info!(
            workers = worker_count,
            queue_capacity = config.queue_capacity,
            sinks = ?sink_names,
            "Persistence pool started"
        );

        Self {
            senders: RwLock::new(senders),
            workers: Mutex::new(workers),
            sink_names,
        }
    }

    /// Hand a tick to its symbol's worker without waiting.
    ///
    /// # Errors
    ///
    /// - `DispatchError::QueueFull` if the worker is backed up.
    /// - `DispatchError::Closed` after [`drain`](Self::drain).
    pub fn dispatch(&self, tick: TickRecord) -> Result<(), DispatchError> {
        let senders = self.senders.read();
        if senders.is_empty() {
            return Err(DispatchError::Closed);
        }

        let shard = shard_for(&tick.symbol, senders.len());
        senders[shard].try_send(tick).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
        })
    }

    /// Stop accepting ticks and wait for every queued write to finish.
    pub async fn drain(&self) {
        drop(std::mem::take(&mut *self.senders.write()));

        let workers = std::mem::take(&mut *self.workers.lock());
        for result in join_all(workers).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Persistence worker failed");
            }
        }
        tracing::info!("Persistence pool drained");
    }

    /// Names of the configured sinks.
    #[must_use]
    pub fn sink_names(&self) -> &[&'static str] {
        &self.sink_names
    }
}

impl std::fmt::Debug for PersistencePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistencePool")
            .field("workers", &self.senders.read().len())
            .field("sinks", &self.sink_names)
            .finish()
    }
}

// Modulo first so the narrowing cast is lossless.
#[allow(clippy::cast_possible_truncation)]
fn shard_for(symbol: &str, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    symbol.hash(&mut hasher);
    (hasher.finish() % shards as u64) as usize
}

async fn run_worker(
    id: usize,
    sinks: Arc<[Arc<dyn TickSink>]>,
    mut rx: mpsc::Receiver<TickRecord>,
) {
    while let Some(tick) = rx.recv().await {
        join_all(sinks.iter().map(|sink| write_one(sink.as_ref(), &tick))).await;
    }
    tracing::debug!(worker = id, "Persistence worker stopped");
}

async fn write_one(sink: &dyn TickSink, tick: &TickRecord) {
    let started = Instant::now();
    match sink.persist(tick).await {
        Ok(()) => record_sink_write(sink.name(), WriteOutcome::Ok, started.elapsed()),
        Err(e) => {
            tracing::warn!(
                sink = sink.name(),
                symbol = %tick.symbol,
                error = %e,
                "Sink write failed"
            );
            record_sink_write(sink.name(), WriteOutcome::Error, started.elapsed());
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
