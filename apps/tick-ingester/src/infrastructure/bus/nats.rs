//! NATS Publisher
//!
//! Publishes envelopes to a NATS subject without blocking the caller.
//!
//! # Architecture
//!
//! ```text
//! publish() ──try_send──▶ [bounded queue] ──▶ forwarder task ──▶ NATS
//! ```
//!
//! `publish` only enqueues. A single forwarder task drains the queue in
//! order and hands each envelope to the client. A full queue drops the
//! envelope; a transport error is logged and counted. Neither is retried.

use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::ports::{PublishError, TickPublisher};
use crate::infrastructure::metrics::{PublishFailure, record_publish_failure};

/// NATS publisher configuration.
#[derive(Debug, Clone)]
pub struct NatsPublisherConfig {
    /// Server URL.
    pub url: String,
    /// Subject envelopes are published on.
    pub subject: String,
    /// Capacity of the outbound queue.
    pub queue_capacity: usize,
    /// Connection timeout.
    pub connect_timeout: Duration,
}

impl Default for NatsPublisherConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            subject: "market.ticks".to_string(),
            queue_capacity: 4096,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// NATS connection error.
#[derive(Debug, thiserror::Error)]
pub enum NatsConnectError {
    /// The server could not be reached.
    #[error("failed to connect to NATS at {url}: {message}")]
    Connect {
        /// Server URL.
        url: String,
        /// Error details.
        message: String,
    },
}

/// Fire-and-forget NATS publisher.
pub struct NatsPublisher {
    subject: String,
    client: async_nats::Client,
    tx: Mutex<Option<mpsc::Sender<Bytes>>>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl NatsPublisher {
    /// Connect to NATS and start the forwarder task.
    ///
    /// # Errors
    ///
    /// Returns `NatsConnectError` if the server cannot be reached.
    pub async fn connect(config: NatsPublisherConfig) -> Result<Self, NatsConnectError> {
        let client = async_nats::ConnectOptions::new()
            .name("tick-ingester")
            .connection_timeout(config.connect_timeout)
            .connect(config.url.as_str())
            .await
            .map_err(|e| NatsConnectError::Connect {
                url: config.url.clone(),
                message: e.to_string(),
            })?;

        tracing::info!(url = %config.url, subject = %config.subject, "Connected to NATS");
        Ok(Self::with_client(client, config.subject, config.queue_capacity))
    }

    fn with_client(client: async_nats::Client, subject: String, queue_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let forwarder = tokio::spawn(forward(client.clone(), subject.clone(), rx));

        Self {
            subject,
            client,
            tx: Mutex::new(Some(tx)),
            forwarder: Mutex::new(Some(forwarder)),
        }
    }

    /// Stop accepting envelopes, deliver everything queued, and flush.
    pub async fn close(&self) {
        drop(self.tx.lock().take());

        let forwarder = self.forwarder.lock().take();
        if let Some(handle) = forwarder
            && let Err(e) = handle.await
        {
            tracing::warn!(error = %e, "NATS forwarder task failed");
        }

        if let Err(e) = self.client.flush().await {
            tracing::warn!(error = %e, "NATS flush failed");
        }
        tracing::info!(subject = %self.subject, "NATS publisher closed");
    }
}

impl TickPublisher for NatsPublisher {
    fn publish(&self, envelope: Bytes) -> Result<(), PublishError> {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(PublishError::Closed);
        };

        tx.try_send(envelope).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PublishError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => PublishError::Closed,
        })
    }

    fn topic(&self) -> &str {
        &self.subject
    }
}

impl std::fmt::Debug for NatsPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsPublisher")
            .field("subject", &self.subject)
            .field("open", &self.tx.lock().is_some())
            .finish_non_exhaustive()
    }
}

async fn forward(client: async_nats::Client, subject: String, mut rx: mpsc::Receiver<Bytes>) {
    while let Some(payload) = rx.recv().await {
        if let Err(e) = client.publish(subject.clone(), payload).await {
            tracing::warn!(subject = %subject, error = %e, "NATS publish failed");
            record_publish_failure(PublishFailure::Transport);
        }
    }
    tracing::debug!(subject = %subject, "NATS forwarder drained");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_local_server() {
        let config = NatsPublisherConfig::default();
        assert_eq!(config.url, "nats://localhost:4222");
        assert_eq!(config.subject, "market.ticks");
        assert_eq!(config.queue_capacity, 4096);
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        let config = NatsPublisherConfig {
            url: "nats://127.0.0.1:1".to_string(),
            connect_timeout: Duration::from_millis(200),
            ..NatsPublisherConfig::default()
        };
        let err = NatsPublisher::connect(config).await.unwrap_err();
        assert!(matches!(err, NatsConnectError::Connect { .. }));
    }
}
