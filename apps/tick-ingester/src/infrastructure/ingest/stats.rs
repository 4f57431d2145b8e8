//! Ingestion state tracking shared with the read API.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Live counters and socket state of the ingestion loop.
#[derive(Debug, Default)]
pub struct IngestStats {
    socket_bound: AtomicBool,
    local_addr: parking_lot::RwLock<Option<SocketAddr>>,
    last_tick_at: parking_lot::RwLock<Option<DateTime<Utc>>>,
    datagrams_received: AtomicU64,
    datagrams_discarded: AtomicU64,
    ticks_ingested: AtomicU64,
    encode_failures: AtomicU64,
    publish_failures: AtomicU64,
    persist_dropped: AtomicU64,
}

impl IngestStats {
    /// Create empty stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the socket bound at `addr`.
    pub fn set_bound(&self, addr: SocketAddr) {
        *self.local_addr.write() = Some(addr);
        self.socket_bound.store(true, Ordering::Release);
    }

    /// Mark the socket released.
    pub fn set_unbound(&self) {
        self.socket_bound.store(false, Ordering::Release);
    }

    /// Whether the ingestion socket is currently bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.socket_bound.load(Ordering::Acquire)
    }

    /// Address the socket is bound to, if it ever was.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.read()
    }

    /// Increment datagrams received.
    pub fn increment_received(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment datagrams discarded.
    pub fn increment_discarded(&self) {
        self.datagrams_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment accepted ticks and stamp the last-tick time.
    pub fn increment_ingested(&self) {
        self.ticks_ingested.fetch_add(1, Ordering::Relaxed);
        *self.last_tick_at.write() = Some(Utc::now());
    }

    /// Increment encode failures.
    pub fn increment_encode_failures(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment publish failures.
    pub fn increment_publish_failures(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment persistence dispatch drops.
    pub fn increment_persist_dropped(&self) {
        self.persist_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> IngestSnapshot {
        IngestSnapshot {
            socket_bound: self.is_bound(),
            local_addr: self.local_addr().map(|a| a.to_string()),
            last_tick_at: *self.last_tick_at.read(),
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            datagrams_discarded: self.datagrams_discarded.load(Ordering::Relaxed),
            ticks_ingested: self.ticks_ingested.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            persist_dropped: self.persist_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Serializable view of [`IngestStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestSnapshot {
    /// Whether the socket is bound.
    pub socket_bound: bool,
    /// Bound address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_addr: Option<String>,
    /// Time of the last accepted tick.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tick_at: Option<DateTime<Utc>>,
    /// Datagrams read from the socket.
    pub datagrams_received: u64,
    /// Datagrams discarded as malformed.
    pub datagrams_discarded: u64,
    /// Datagrams turned into ticks.
    pub ticks_ingested: u64,
    /// Ticks dropped because the envelope could not be encoded.
    pub encode_failures: u64,
    /// Envelopes the publisher refused.
    pub publish_failures: u64,
    /// Ticks not handed to persistence because a queue was full.
    pub persist_dropped: u64,
}
