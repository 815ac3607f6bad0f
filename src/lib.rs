//! # status-hub
//!
//! Multi-tenant status page service with a realtime WebSocket feed.
//!
//! Organizations manage services and incidents over a REST API. Every
//! committed change is wrapped in an [`Envelope`](domain::Envelope) and
//! fanned out by the [`Hub`](ws::Hub) to every connected dashboard. A slow
//! or dead client never holds up the others: its bounded queue fills and
//! the hub drops it.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── StatusService (service/) ──► Notifier ──► Hub (ws/)
//!     │                                              └── Connection × N
//!     ├── StatusRepository (persistence/)
//!     │
//!     └── DocumentStore: memory or PostgreSQL
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
