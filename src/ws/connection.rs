//! A single live dashboard connection.
//!
//! Each [`Connection`] owns a bounded outbound queue and a dedicated
//! delivery task that drains it into the client [`Transport`] in order.
//! The hub only ever enqueues with `try_send`, so a slow client can never
//! stall a broadcast; a full queue is reported back as `false` and the hub
//! evicts the connection.
//!
//! State only moves forward: `connecting → active → closing → closed`.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::{Notify, mpsc};

use super::transport::Transport;
use crate::domain::Envelope;

/// Process-unique identifier of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Creates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConnectionState {
    /// Transport accepted, delivery task not started yet.
    Connecting = 0,
    /// Accepting envelopes.
    Active = 1,
    /// Shutdown requested; enqueue attempts fail fast.
    Closing = 2,
    /// Transport closed, delivery task finished.
    Closed = 3,
}

impl ConnectionState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Connecting,
            1 => Self::Active,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// State shared between the handle and its delivery task.
#[derive(Debug)]
struct Lifecycle {
    state: AtomicU8,
    shutdown: Notify,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            shutdown: Notify::new(),
        }
    }

    fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves to `to` if the current state is strictly earlier.
    fn advance(&self, to: ConnectionState) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current >= to as u8 {
                return false;
            }
            match self.state.compare_exchange(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Handle to one accepted client transport and its outbound queue.
///
/// Held exclusively by the hub's registry. Dropping the handle closes the
/// outbound queue, which also ends the delivery task.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    outbound: mpsc::Sender<Arc<Envelope>>,
    lifecycle: Arc<Lifecycle>,
}

impl Connection {
    /// Wraps a freshly accepted transport and starts its delivery task.
    ///
    /// `closed` receives this connection's id once the delivery task ends,
    /// whatever the reason (write error, peer gone, explicit close).
    /// A `capacity` of zero is treated as one.
    #[must_use]
    pub fn accept<T: Transport>(
        transport: T,
        capacity: usize,
        closed: mpsc::UnboundedSender<ConnectionId>,
    ) -> Self {
        let id = ConnectionId::new();
        let lifecycle = Arc::new(Lifecycle::new());
        let (outbound, queue) = mpsc::channel(capacity.max(1));

        lifecycle.advance(ConnectionState::Active);
        tokio::spawn(deliver(
            id,
            transport,
            queue,
            Arc::clone(&lifecycle),
            closed,
        ));

        Self {
            id,
            outbound,
            lifecycle,
        }
    }

    /// Returns the connection id.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.lifecycle.get()
    }

    /// Attempts a non-blocking enqueue.
    ///
    /// Returns `false` if the queue is full or the connection is no longer
    /// active; the caller should then drop the connection.
    #[must_use]
    pub fn enqueue(&self, envelope: Arc<Envelope>) -> bool {
        if self.state() != ConnectionState::Active {
            return false;
        }
        self.outbound.try_send(envelope).is_ok()
    }

    /// Requests shutdown of the transport.
    ///
    /// Only the first call (from here or from the delivery task after a
    /// write error) has an effect; it returns `true`. Later calls are
    /// no-ops returning `false`.
    pub fn close(&self) -> bool {
        if self.lifecycle.advance(ConnectionState::Closing) {
            self.lifecycle.shutdown.notify_one();
            true
        } else {
            false
        }
    }
}

/// Drains `queue` into `transport` until shutdown, then closes it.
async fn deliver<T: Transport>(
    id: ConnectionId,
    mut transport: T,
    mut queue: mpsc::Receiver<Arc<Envelope>>,
    lifecycle: Arc<Lifecycle>,
    closed: mpsc::UnboundedSender<ConnectionId>,
) {
    loop {
        let envelope = tokio::select! {
            biased;
            () = lifecycle.shutdown.notified() => break,
            next = queue.recv() => match next {
                Some(envelope) => envelope,
                None => break,
            },
        };

        let text = match serde_json::to_string(&*envelope) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(conn_id = %id, kind = %envelope.kind(), error = %e, "envelope serialization failed");
                continue;
            }
        };

        let written = tokio::select! {
            biased;
            () = lifecycle.shutdown.notified() => break,
            result = transport.send_text(text) => result,
        };
        if let Err(e) = written {
            tracing::debug!(conn_id = %id, error = %e, "ws write failed");
            break;
        }
    }

    lifecycle.advance(ConnectionState::Closing);
    queue.close();
    transport.close().await;
    lifecycle.advance(ConnectionState::Closed);
    tracing::debug!(conn_id = %id, "connection closed");

    // The hub may already be gone during process shutdown.
    let _ = closed.send(id);
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::{ChangeEvent, OrganizationId, ServiceRecord};
    use crate::ws::transport::testing::{BrokenTransport, ChannelTransport, StalledTransport};

    fn envelope(name: &str) -> Arc<Envelope> {
        let svc = ServiceRecord::new(
            OrganizationId::new(),
            name.to_string(),
            String::new(),
            String::new(),
        );
        Arc::new(Envelope::new(ChangeEvent::service_created(&svc)))
    }

    async fn wait_for_state(conn: &Connection, state: ConnectionState) {
        for _ in 0..100 {
            if conn.state() == state {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("connection never reached {state:?}, stuck in {:?}", conn.state());
    }

    #[tokio::test]
    async fn accept_starts_active_and_delivers_in_order() {
        let (transport, mut peer) = ChannelTransport::pair();
        let (closed_tx, _closed_rx) = mpsc::unbounded_channel();
        let conn = Connection::accept(transport, 8, closed_tx);
        assert_eq!(conn.state(), ConnectionState::Active);

        assert!(conn.enqueue(envelope("first")));
        assert!(conn.enqueue(envelope("second")));

        let Some(first) = peer.next_json().await else {
            panic!("first message missing");
        };
        let Some(second) = peer.next_json().await else {
            panic!("second message missing");
        };
        assert_eq!(first["data"]["service_name"], "first");
        assert_eq!(second["data"]["service_name"], "second");
    }

    #[tokio::test]
    async fn enqueue_fails_when_queue_is_full() {
        let (closed_tx, _closed_rx) = mpsc::unbounded_channel();
        let conn = Connection::accept(StalledTransport, 1, closed_tx);

        // One envelope may be in flight inside the stalled write and one
        // sits in the queue; the third cannot fit either way.
        let accepted = (0..3).filter(|_| conn.enqueue(envelope("x"))).count();
        assert!(accepted <= 2);
        assert!(!conn.enqueue(envelope("overflow")));
    }

    #[tokio::test]
    async fn close_runs_once() {
        let (transport, peer) = ChannelTransport::pair();
        let (closed_tx, mut closed_rx) = mpsc::unbounded_channel();
        let conn = Connection::accept(transport, 4, closed_tx);

        assert!(conn.close());
        assert!(!conn.close());
        assert!(!conn.enqueue(envelope("late")));

        wait_for_state(&conn, ConnectionState::Closed).await;
        assert!(peer.is_closed());
        assert_eq!(closed_rx.recv().await, Some(conn.id()));
    }

    #[tokio::test]
    async fn close_interrupts_a_stalled_write() {
        let (closed_tx, mut closed_rx) = mpsc::unbounded_channel();
        let conn = Connection::accept(StalledTransport, 4, closed_tx);
        assert!(conn.enqueue(envelope("stuck")));

        assert!(conn.close());
        let notified = tokio::time::timeout(Duration::from_secs(1), closed_rx.recv()).await;
        assert_eq!(notified.ok().flatten(), Some(conn.id()));
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn write_error_closes_and_reports() {
        let (closed_tx, mut closed_rx) = mpsc::unbounded_channel();
        let conn = Connection::accept(BrokenTransport, 4, closed_tx);
        assert!(conn.enqueue(envelope("boom")));

        assert_eq!(closed_rx.recv().await, Some(conn.id()));
        wait_for_state(&conn, ConnectionState::Closed).await;
        assert!(!conn.close());
    }

    #[test]
    fn states_only_move_forward() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.advance(ConnectionState::Active));
        assert!(lifecycle.advance(ConnectionState::Closed));
        assert!(!lifecycle.advance(ConnectionState::Closing));
        assert!(!lifecycle.advance(ConnectionState::Active));
        assert_eq!(lifecycle.get(), ConnectionState::Closed);
    }
}
