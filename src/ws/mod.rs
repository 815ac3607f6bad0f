//! WebSocket layer: connection hub, per-client delivery, upgrade handler.
//!
//! Dashboards connect to `/ws` and passively receive an
//! [`Envelope`](crate::domain::Envelope) for every committed service or
//! incident change. The stream is one-way; client messages are ignored.

pub mod connection;
pub mod handler;
pub mod hub;
pub mod transport;

pub use connection::{Connection, ConnectionId, ConnectionState};
pub use hub::{Hub, HubConfig, HubError, HubStats};
pub use transport::{Transport, TransportError, WebSocketTransport};
