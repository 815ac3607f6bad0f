//! Outbound half of a client transport.
//!
//! A [`Connection`](super::connection::Connection)'s delivery task owns one
//! [`Transport`] and is the only code that writes to it. The WebSocket
//! implementation wraps the sink half of an upgraded axum socket; tests
//! plug in in-memory transports.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::SinkExt;
use futures_util::stream::SplitSink;

/// Upper bound on how long a close handshake may take on a stalled peer.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Failure writing to a client transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer or the underlying socket rejected the write.
    #[error("transport write failed: {0}")]
    Write(String),

    /// The transport was already closed.
    #[error("transport closed")]
    Closed,
}

/// Write side of a long-lived client channel.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Writes one serialized message.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the message could not be written;
    /// the connection is then closed by its delivery task.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Closes the transport. Must not fail and must return in bounded time.
    async fn close(&mut self);
}

/// [`Transport`] over the sink half of an axum WebSocket.
pub struct WebSocketTransport {
    sink: SplitSink<WebSocket, Message>,
}

impl WebSocketTransport {
    /// Wraps the sink half of a split socket.
    #[must_use]
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self { sink }
    }
}

impl fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sink
            .send(Message::text(text))
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    async fn close(&mut self) {
        let handshake = async {
            let _ = self.sink.send(Message::Close(None)).await;
            let _ = self.sink.close().await;
        };
        if tokio::time::timeout(CLOSE_TIMEOUT, handshake).await.is_err() {
            tracing::debug!("ws close handshake timed out");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transports for hub and connection tests.

    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::{Transport, TransportError};

    /// Forwards every written message to an unbounded channel.
    #[derive(Debug)]
    pub(crate) struct ChannelTransport {
        tx: mpsc::UnboundedSender<String>,
        closed: Arc<AtomicBool>,
    }

    /// Test-side view of a [`ChannelTransport`].
    #[derive(Debug)]
    pub(crate) struct ChannelPeer {
        pub(crate) rx: mpsc::UnboundedReceiver<String>,
        pub(crate) closed: Arc<AtomicBool>,
    }

    impl ChannelTransport {
        pub(crate) fn pair() -> (Self, ChannelPeer) {
            let (tx, rx) = mpsc::unbounded_channel();
            let closed = Arc::new(AtomicBool::new(false));
            (
                Self {
                    tx,
                    closed: Arc::clone(&closed),
                },
                ChannelPeer { rx, closed },
            )
        }
    }

    impl ChannelPeer {
        /// Receives the next message as JSON, waiting at most one second.
        pub(crate) async fn next_json(&mut self) -> Option<serde_json::Value> {
            let text = tokio::time::timeout(std::time::Duration::from_secs(1), self.rx.recv())
                .await
                .ok()
                .flatten()?;
            serde_json::from_str(&text).ok()
        }

        pub(crate) fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ChannelTransport {
        async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
            self.tx.send(text).map_err(|_| TransportError::Closed)
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    /// Never completes a write, simulating a client that stopped reading.
    #[derive(Debug, Default)]
    pub(crate) struct StalledTransport;

    #[async_trait]
    impl Transport for StalledTransport {
        async fn send_text(&mut self, _text: String) -> Result<(), TransportError> {
            std::future::pending().await
        }

        async fn close(&mut self) {}
    }

    /// Neither writes nor closes ever complete, leaving its connection
    /// parked in `Closing` once shut down.
    #[derive(Debug, Default)]
    pub(crate) struct StuckTransport;

    #[async_trait]
    impl Transport for StuckTransport {
        async fn send_text(&mut self, _text: String) -> Result<(), TransportError> {
            std::future::pending().await
        }

        async fn close(&mut self) {
            std::future::pending::<()>().await;
        }
    }

    /// Fails every write.
    #[derive(Debug, Default)]
    pub(crate) struct BrokenTransport;

    #[async_trait]
    impl Transport for BrokenTransport {
        async fn send_text(&mut self, _text: String) -> Result<(), TransportError> {
            Err(TransportError::Write("connection reset by peer".to_string()))
        }

        async fn close(&mut self) {}
    }
}
