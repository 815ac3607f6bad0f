//! Service layer: business logic orchestration.
//!
//! [`StatusService`] validates requests, persists through the
//! [`StatusRepository`](crate::persistence::StatusRepository), and hands
//! every committed change to the [`Notifier`] for realtime broadcast.

pub mod notifier;
pub mod status_service;

pub use notifier::Notifier;
pub use status_service::{IncidentChanges, PUBLIC_INCIDENT_LIMIT, PublicStatus, StatusService};
