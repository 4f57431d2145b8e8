//! UDP datagram receiver.
//!
//! The single producer of the ingestion path: one task reads datagrams into
//! a fixed buffer and hands each to the [`IngestPipeline`] until cancelled.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use super::pipeline::IngestPipeline;
use crate::infrastructure::codec::MAX_DATAGRAM_BYTES;

/// Receiver error.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The socket could not be bound.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Bound UDP socket feeding the pipeline.
#[derive(Debug)]
pub struct DatagramReceiver {
    socket: UdpSocket,
    pipeline: Arc<IngestPipeline>,
}

impl DatagramReceiver {
    /// Bind the ingestion socket.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Bind` if the address is unavailable.
    pub async fn bind(addr: SocketAddr, pipeline: Arc<IngestPipeline>) -> Result<Self, IngestError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| IngestError::Bind { addr, source })?;

        let local = socket.local_addr().unwrap_or(addr);
        pipeline.stats().set_bound(local);
        tracing::info!(addr = %local, "Listening for datagrams");

        Ok(Self { socket, pipeline })
    }

    /// Address the socket is bound to.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the address cannot be read.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive and process datagrams until `cancel` fires.
    ///
    /// Receive errors are logged and the loop continues.
    pub async fn run(self, cancel: CancellationToken) {
        let mut buf = [0u8; MAX_DATAGRAM_BYTES];

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, peer)) => {
                        tracing::trace!(%peer, len, "Datagram received");
                        self.pipeline.handle(&buf[..len]);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Datagram receive failed");
                    }
                },
            }
        }

        self.pipeline.stats().set_unbound();
        tracing::info!("Datagram receiver stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::application::ports::TickPublisher;
    use crate::infrastructure::bus::BroadcastBus;
    use crate::infrastructure::codec::{WireDecoder, decode_envelope};
    use crate::infrastructure::ingest::{IngestStats, PersistencePool, PoolConfig};

    fn pipeline(bus: &Arc<BroadcastBus>) -> Arc<IngestPipeline> {
        Arc::new(IngestPipeline::new(
            WireDecoder::default(),
            Arc::clone(bus) as Arc<dyn TickPublisher>,
            Arc::new(PersistencePool::spawn(Vec::new(), PoolConfig::default())),
            Arc::new(IngestStats::new()),
        ))
    }

    #[tokio::test]
    async fn datagrams_flow_to_the_bus() {
        let bus = Arc::new(BroadcastBus::new("market.ticks", 16));
        let mut rx = bus.subscribe();
        let pipeline = pipeline(&bus);

        let receiver = DatagramReceiver::bind("127.0.0.1:0".parse().unwrap(), Arc::clone(&pipeline))
            .await
            .unwrap();
        let addr = receiver.local_addr().unwrap();
        assert!(pipeline.stats().is_bound());

        let cancel = CancellationToken::new();
        let task = tokio::spawn(receiver.run(cancel.clone()));

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"BTC-USD,74250.65", addr).await.unwrap();

        let envelope = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decode_envelope(&envelope).unwrap().symbol, "BTC-USD");

        cancel.cancel();
        task.await.unwrap();
        assert!(!pipeline.stats().is_bound());
    }

    #[tokio::test]
    async fn bind_conflict_is_an_error() {
        let bus = Arc::new(BroadcastBus::new("market.ticks", 16));
        let taken = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let err = DatagramReceiver::bind(addr, pipeline(&bus)).await.unwrap_err();
        assert!(matches!(err, IngestError::Bind { .. }));
    }
}
