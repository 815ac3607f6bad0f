//! Domain layer: tenant records and the broadcast envelope.
//!
//! Organizations own services and incidents; every committed change to a
//! service or incident is described by a [`ChangeEvent`] and broadcast to
//! live dashboards inside an [`Envelope`].

pub mod envelope;
pub mod ids;
pub mod incident;
pub mod organization;
pub mod service;

pub use envelope::{ChangeEvent, Envelope, EventKind};
pub use ids::{IncidentId, OrganizationId, ServiceId};
pub use incident::{IncidentRecord, IncidentStatus};
pub use organization::{Member, Organization};
pub use service::{ServiceRecord, ServiceStatus};
