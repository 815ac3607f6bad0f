//! Connection hub: the single owner of the live-connection registry.
//!
//! [`Hub`] is a cheap, cloneable handle to a control loop running on its
//! own task. Registration, unregistration and broadcast are messages on
//! one bounded queue, so every membership change and every fan-out is
//! applied in the order the loop receives them and no caller ever sees a
//! partially-updated registry.
//!
//! Fan-out never waits on a client. Each envelope is offered to every
//! connection with a non-blocking enqueue; a connection whose outbound
//! queue is full is treated as unresponsive, closed, and removed.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use utoipa::ToSchema;

use super::connection::{Connection, ConnectionId, ConnectionState};
use super::transport::Transport;
use crate::domain::Envelope;

/// Hub sizing.
#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    /// Capacity of the control-loop queue. Callers wait for a free slot.
    pub command_capacity: usize,
    /// Capacity of each connection's outbound queue.
    pub outbound_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            command_capacity: 1024,
            outbound_capacity: 256,
        }
    }
}

/// Error returned when the control loop is no longer running.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The control loop has exited (process shutdown).
    #[error("hub control loop is not running")]
    Stopped,
}

/// Point-in-time hub counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct HubStats {
    /// Live registered connections.
    pub connections: usize,
    /// Broadcasts processed since start.
    pub broadcasts: u64,
    /// Connections dropped because their outbound queue was full.
    pub evictions: u64,
}

#[derive(Debug)]
enum HubCommand {
    Register(Connection),
    Unregister(ConnectionId),
    Broadcast(Arc<Envelope>),
    Contains(ConnectionId, oneshot::Sender<bool>),
    Stats(oneshot::Sender<HubStats>),
}

/// Handle to the hub control loop.
#[derive(Debug, Clone)]
pub struct Hub {
    commands: mpsc::Sender<HubCommand>,
    closed: mpsc::UnboundedSender<ConnectionId>,
    outbound_capacity: usize,
}

impl Hub {
    /// Starts the control loop on the current tokio runtime.
    ///
    /// The loop runs until every `Hub` handle is dropped, then closes all
    /// remaining connections.
    #[must_use]
    pub fn spawn(config: HubConfig) -> Self {
        let (commands, command_rx) = mpsc::channel(config.command_capacity.max(1));
        let (closed, closed_rx) = mpsc::unbounded_channel();

        let control = ControlLoop {
            connections: HashMap::new(),
            commands: command_rx,
            closed: closed_rx,
            broadcasts: 0,
            evictions: 0,
        };
        tokio::spawn(control.run());

        Self {
            commands,
            closed,
            outbound_capacity: config.outbound_capacity,
        }
    }

    /// Wraps a newly upgraded transport in a [`Connection`] wired to this
    /// hub. The connection is not registered yet.
    #[must_use]
    pub fn open<T: Transport>(&self, transport: T) -> Connection {
        Connection::accept(transport, self.outbound_capacity, self.closed.clone())
    }

    /// Accept path: opens a connection for `transport` and registers it.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Stopped`] if the control loop has exited.
    pub async fn accept<T: Transport>(&self, transport: T) -> Result<ConnectionId, HubError> {
        let connection = self.open(transport);
        let id = connection.id();
        self.register(connection).await?;
        Ok(id)
    }

    /// Adds a connection to the registry.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Stopped`] if the control loop has exited.
    pub async fn register(&self, connection: Connection) -> Result<(), HubError> {
        self.send(HubCommand::Register(connection)).await
    }

    /// Removes and closes a connection. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Stopped`] if the control loop has exited.
    pub async fn unregister(&self, id: ConnectionId) -> Result<(), HubError> {
        self.send(HubCommand::Unregister(id)).await
    }

    /// Queues `envelope` for delivery to every registered connection.
    ///
    /// Waits only for room in the control-loop queue, never for a client.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Stopped`] if the control loop has exited.
    pub async fn broadcast(&self, envelope: Envelope) -> Result<(), HubError> {
        self.send(HubCommand::Broadcast(Arc::new(envelope))).await
    }

    /// Returns `true` if `id` is currently registered.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Stopped`] if the control loop has exited.
    pub async fn contains(&self, id: ConnectionId) -> Result<bool, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::Contains(id, tx)).await?;
        rx.await.map_err(|_| HubError::Stopped)
    }

    /// Returns the current hub counters.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Stopped`] if the control loop has exited.
    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::Stats(tx)).await?;
        rx.await.map_err(|_| HubError::Stopped)
    }

    async fn send(&self, command: HubCommand) -> Result<(), HubError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| HubError::Stopped)
    }
}

/// State owned exclusively by the control-loop task.
struct ControlLoop {
    connections: HashMap<ConnectionId, Connection>,
    commands: mpsc::Receiver<HubCommand>,
    closed: mpsc::UnboundedReceiver<ConnectionId>,
    broadcasts: u64,
    evictions: u64,
}

impl ControlLoop {
    async fn run(mut self) {
        tracing::debug!("hub control loop started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(id) = self.closed.recv() => self.remove(id, "transport closed"),
            }
        }

        for (_, connection) in self.connections.drain() {
            connection.close();
        }
        tracing::debug!("hub control loop stopped");
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register(connection) => {
                let id = connection.id();
                self.connections.insert(id, connection);
                tracing::info!(conn_id = %id, connections = self.connections.len(), "ws client registered");
            }
            HubCommand::Unregister(id) => self.remove(id, "unregistered"),
            HubCommand::Broadcast(envelope) => self.broadcast(&envelope),
            HubCommand::Contains(id, reply) => {
                let _ = reply.send(self.connections.contains_key(&id));
            }
            HubCommand::Stats(reply) => {
                let _ = reply.send(HubStats {
                    connections: self.connections.len(),
                    broadcasts: self.broadcasts,
                    evictions: self.evictions,
                });
            }
        }
    }

    fn remove(&mut self, id: ConnectionId, reason: &'static str) {
        if let Some(connection) = self.connections.remove(&id) {
            connection.close();
            tracing::info!(conn_id = %id, reason, connections = self.connections.len(), "ws client removed");
        }
    }

    fn broadcast(&mut self, envelope: &Arc<Envelope>) {
        self.broadcasts = self.broadcasts.saturating_add(1);
        if self.connections.is_empty() {
            tracing::trace!(kind = %envelope.kind(), "broadcast with no listeners");
            return;
        }

        let mut stalled = Vec::new();
        let mut closing = Vec::new();
        for (id, connection) in &self.connections {
            if connection.enqueue(Arc::clone(envelope)) {
                continue;
            }
            // A connection that is already shutting down has not fallen
            // behind; its close notice just has not been handled yet.
            if connection.state() == ConnectionState::Active {
                stalled.push(*id);
            } else {
                closing.push(*id);
            }
        }

        let delivered = self.connections.len() - stalled.len() - closing.len();
        for id in closing {
            self.remove(id, "transport closed");
        }
        for id in stalled {
            if let Some(connection) = self.connections.remove(&id) {
                connection.close();
                self.evictions = self.evictions.saturating_add(1);
                tracing::warn!(conn_id = %id, kind = %envelope.kind(), "ws client outbound queue full, dropping connection");
            }
        }
        tracing::debug!(kind = %envelope.kind(), delivered, "envelope broadcast");
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::{ChangeEvent, OrganizationId, ServiceRecord};
    use crate::ws::transport::testing::{
        BrokenTransport, ChannelPeer, ChannelTransport, StalledTransport, StuckTransport,
    };

    fn service(name: &str) -> ServiceRecord {
        ServiceRecord::new(
            OrganizationId::new(),
            name.to_string(),
            String::new(),
            String::new(),
        )
    }

    fn created(svc: &ServiceRecord) -> Envelope {
        Envelope::new(ChangeEvent::service_created(svc))
    }

    fn hub(outbound_capacity: usize) -> Hub {
        Hub::spawn(HubConfig {
            command_capacity: 64,
            outbound_capacity,
        })
    }

    #[tokio::test]
    async fn fan_out_then_unregister() {
        let hub = hub(16);
        let (a_transport, mut a) = ChannelTransport::pair();
        let (b_transport, mut b) = ChannelTransport::pair();
        let Ok(a_id) = hub.accept(a_transport).await else {
            panic!("hub stopped");
        };
        let Ok(_b_id) = hub.accept(b_transport).await else {
            panic!("hub stopped");
        };

        let svc = service("s1");
        assert!(hub.broadcast(created(&svc)).await.is_ok());

        for peer in [&mut a, &mut b] {
            let Some(msg) = peer.next_json().await else {
                panic!("expected service_created");
            };
            assert_eq!(msg["type"], "service_created");
            assert_eq!(msg["data"]["service_id"], svc.id.to_string());
        }

        assert!(hub.unregister(a_id).await.is_ok());
        assert!(
            hub.broadcast(Envelope::new(ChangeEvent::service_deleted(&svc)))
                .await
                .is_ok()
        );

        let Some(msg) = b.next_json().await else {
            panic!("b should receive service_deleted");
        };
        assert_eq!(msg["type"], "service_deleted");
        assert!(a.next_json().await.is_none());
        assert!(a.is_closed());
    }

    #[tokio::test]
    async fn full_queue_evicts_only_that_connection() {
        let hub = hub(1);
        let Ok(slow) = hub.accept(StalledTransport).await else {
            panic!("hub stopped");
        };
        let mut peers = Vec::new();
        for _ in 0..3 {
            let (transport, peer) = ChannelTransport::pair();
            let Ok(_) = hub.accept(transport).await else {
                panic!("hub stopped");
            };
            peers.push(peer);
        }

        // Capacity 1 plus one in-flight write: the third broadcast overflows.
        for i in 0..3 {
            assert!(hub.broadcast(created(&service(&format!("s{i}")))).await.is_ok());
            for peer in &mut peers {
                assert!(peer.next_json().await.is_some());
            }
        }

        assert_eq!(hub.contains(slow).await.ok(), Some(false));
        let Ok(stats) = hub.stats().await else {
            panic!("hub stopped");
        };
        assert_eq!(stats.connections, 3);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.broadcasts, 3);
    }

    #[tokio::test]
    async fn sequential_broadcasts_keep_order() {
        let hub = hub(64);
        let (transport, mut peer) = ChannelTransport::pair();
        let Ok(_) = hub.accept(transport).await else {
            panic!("hub stopped");
        };

        for i in 0..20 {
            assert!(hub.broadcast(created(&service(&format!("s{i}")))).await.is_ok());
        }
        for i in 0..20 {
            let Some(msg) = peer.next_json().await else {
                panic!("message {i} missing");
            };
            assert_eq!(msg["data"]["service_name"], format!("s{i}"));
        }
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let hub = hub(4);
        let (transport, _peer) = ChannelTransport::pair();
        let Ok(id) = hub.accept(transport).await else {
            panic!("hub stopped");
        };

        assert!(hub.unregister(id).await.is_ok());
        assert!(hub.unregister(id).await.is_ok());
        assert!(hub.unregister(ConnectionId::new()).await.is_ok());
        assert_eq!(hub.contains(id).await.ok(), Some(false));
    }

    #[tokio::test]
    async fn broadcast_without_connections_is_a_noop() {
        let hub = hub(4);
        tokio_test::assert_ok!(hub.broadcast(created(&service("lonely"))).await);
        let Ok(stats) = hub.stats().await else {
            panic!("hub stopped");
        };
        assert_eq!(stats, HubStats {
            connections: 0,
            broadcasts: 1,
            evictions: 0,
        });
    }

    #[tokio::test]
    async fn failed_transport_is_removed_without_affecting_others() {
        let hub = hub(4);
        let Ok(broken) = hub.accept(BrokenTransport).await else {
            panic!("hub stopped");
        };
        let (transport, mut healthy) = ChannelTransport::pair();
        let Ok(_) = hub.accept(transport).await else {
            panic!("hub stopped");
        };

        assert!(hub.broadcast(created(&service("s1"))).await.is_ok());
        assert!(healthy.next_json().await.is_some());

        let mut removed = false;
        for _ in 0..100 {
            if hub.contains(broken).await.ok() == Some(false) {
                removed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(removed, "broken connection should leave the registry");

        assert!(hub.broadcast(created(&service("s2"))).await.is_ok());
        let Some(msg) = healthy.next_json().await else {
            panic!("healthy connection should keep receiving");
        };
        assert_eq!(msg["data"]["service_name"], "s2");
    }

    #[tokio::test]
    async fn registered_connection_is_visible() {
        let hub = hub(4);
        let (transport, _peer) = ChannelTransport::pair();
        let connection = hub.open(transport);
        let id = connection.id();
        assert_eq!(hub.contains(id).await.ok(), Some(false));
        assert!(hub.register(connection).await.is_ok());
        assert_eq!(hub.contains(id).await.ok(), Some(true));
    }

    #[tokio::test]
    async fn closing_connection_is_removed_without_counting_an_eviction() {
        let hub = hub(4);
        let connection = hub.open(StuckTransport);
        let id = connection.id();
        assert!(connection.close());
        assert_eq!(connection.state(), ConnectionState::Closing);
        assert!(hub.register(connection).await.is_ok());

        assert!(hub.broadcast(created(&service("s1"))).await.is_ok());

        assert_eq!(hub.contains(id).await.ok(), Some(false));
        let Ok(stats) = hub.stats().await else {
            panic!("hub stopped");
        };
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.connections, 0);
    }

    /// Reads every message until `marker` arrives or the peer's transport
    /// is dropped, returning the service names seen.
    async fn collect_names(peer: &mut ChannelPeer, marker: &str) -> Vec<String> {
        let mut names = Vec::new();
        while let Some(msg) = peer.next_json().await {
            let Some(name) = msg["data"]["service_name"].as_str() else {
                panic!("unexpected envelope {msg}");
            };
            names.push(name.to_string());
            if name == marker {
                break;
            }
        }
        names
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn registry_stays_consistent_under_concurrent_churn() {
        const TASKS: usize = 32;
        let hub = hub(256);

        let mut handles = Vec::with_capacity(TASKS);
        for i in 0..TASKS {
            let hub = hub.clone();
            handles.push(tokio::spawn(async move {
                let (transport, peer) = ChannelTransport::pair();
                let Ok(id) = hub.accept(transport).await else {
                    panic!("hub stopped");
                };
                assert!(hub.broadcast(created(&service(&format!("hello-{i}")))).await.is_ok());
                tokio::task::yield_now().await;

                let leaves = i % 2 == 0;
                if leaves {
                    assert!(hub.unregister(id).await.is_ok());
                    assert!(hub.broadcast(created(&service(&format!("after-{i}")))).await.is_ok());
                }
                (i, leaves, peer)
            }));
        }

        let mut peers = Vec::with_capacity(TASKS);
        for handle in handles {
            let Ok(result) = handle.await else {
                panic!("churn task panicked");
            };
            peers.push(result);
        }

        assert!(hub.broadcast(created(&service("final"))).await.is_ok());

        let survivors = peers.iter().filter(|(_, leaves, _)| !leaves).count();
        let Ok(stats) = hub.stats().await else {
            panic!("hub stopped");
        };
        assert_eq!(stats.connections, survivors);
        assert_eq!(stats.evictions, 0);

        for (i, leaves, mut peer) in peers {
            let names = collect_names(&mut peer, "final").await;

            let mut unique = names.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), names.len(), "peer {i} saw a duplicate: {names:?}");

            if leaves {
                let own_goodbye = format!("after-{i}");
                assert!(!names.contains(&own_goodbye), "peer {i} got {own_goodbye}");
                assert!(!names.iter().any(|n| n == "final"), "peer {i} got final");
                assert!(peer.is_closed());
            } else {
                assert_eq!(names.last().map(String::as_str), Some("final"));
                assert!(names.contains(&format!("hello-{i}")), "peer {i} missed its own hello");
            }
        }
    }
}
