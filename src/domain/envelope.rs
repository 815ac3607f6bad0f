//! Broadcast envelope describing one committed state change.
//!
//! A [`ChangeEvent`] carries the strongly-typed fields for one kind of
//! change. An [`Envelope`] stamps it with the broadcast time and is the only
//! thing the hub fans out. The JSON shape is produced at the boundary only:
//!
//! ```json
//! { "type": "service_created",
//!   "data": { "service_id": "...", ..., "action": "service_created", "timestamp": 1700000000 } }
//! ```

use std::fmt;

use chrono::Utc;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::{
    IncidentId, IncidentRecord, IncidentStatus, OrganizationId, ServiceId, ServiceRecord,
    ServiceStatus,
};

/// Discriminator of an [`Envelope`], also used as its `type` and `action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A service was created.
    ServiceCreated,
    /// A service changed status.
    ServiceStatusUpdated,
    /// A service was soft-deleted.
    ServiceDeleted,
    /// An incident was opened.
    IncidentCreated,
    /// An incident was edited.
    IncidentUpdated,
}

impl EventKind {
    /// Returns the wire name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ServiceCreated => "service_created",
            Self::ServiceStatusUpdated => "service_status_updated",
            Self::ServiceDeleted => "service_deleted",
            Self::IncidentCreated => "incident_created",
            Self::IncidentUpdated => "incident_updated",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of [`EventKind::ServiceCreated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceCreated {
    /// New service id.
    pub service_id: ServiceId,
    /// Service name.
    pub service_name: String,
    /// Initial status.
    pub service_status: ServiceStatus,
    /// Service description.
    pub service_desc: String,
    /// Service URL.
    pub service_url: String,
    /// Owning tenant.
    pub organization_id: OrganizationId,
}

/// Payload of [`EventKind::ServiceStatusUpdated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatusUpdated {
    /// Updated service id.
    pub service_id: ServiceId,
    /// Service name.
    pub service_name: String,
    /// Status before the update.
    pub old_status: ServiceStatus,
    /// Status after the update.
    pub new_status: ServiceStatus,
    /// Operator message attached to the change.
    pub message: String,
    /// Owning tenant.
    pub organization_id: OrganizationId,
}

/// Payload of [`EventKind::ServiceDeleted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDeleted {
    /// Deleted service id.
    pub service_id: ServiceId,
    /// Service name.
    pub service_name: String,
    /// Owning tenant.
    pub organization_id: OrganizationId,
}

/// Payload of [`EventKind::IncidentCreated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncidentCreated {
    /// New incident id.
    pub incident_id: IncidentId,
    /// Incident title.
    pub incident_title: String,
    /// Incident description.
    pub incident_desc: String,
    /// Initial status.
    pub incident_status: IncidentStatus,
    /// Incident category.
    pub incident_type: String,
    /// Owning tenant.
    pub organization_id: OrganizationId,
    /// Impacted services.
    pub affected_services: Vec<ServiceId>,
}

/// Payload of [`EventKind::IncidentUpdated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncidentUpdated {
    /// Updated incident id.
    pub incident_id: IncidentId,
    /// Incident title after the update.
    pub incident_title: String,
    /// Incident description after the update.
    pub incident_desc: String,
    /// Status before the update.
    pub old_status: IncidentStatus,
    /// Status after the update.
    pub new_status: IncidentStatus,
    /// Incident category after the update.
    pub incident_type: String,
    /// Owning tenant.
    pub organization_id: OrganizationId,
    /// Impacted services after the update.
    pub affected_services: Vec<ServiceId>,
}

/// One committed state change, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChangeEvent {
    /// See [`ServiceCreated`].
    ServiceCreated(ServiceCreated),
    /// See [`ServiceStatusUpdated`].
    ServiceStatusUpdated(ServiceStatusUpdated),
    /// See [`ServiceDeleted`].
    ServiceDeleted(ServiceDeleted),
    /// See [`IncidentCreated`].
    IncidentCreated(IncidentCreated),
    /// See [`IncidentUpdated`].
    IncidentUpdated(IncidentUpdated),
}

impl ChangeEvent {
    /// Builds a `service_created` event from the persisted record.
    #[must_use]
    pub fn service_created(service: &ServiceRecord) -> Self {
        Self::ServiceCreated(ServiceCreated {
            service_id: service.id,
            service_name: service.name.clone(),
            service_status: service.status,
            service_desc: service.description.clone(),
            service_url: service.url.clone(),
            organization_id: service.organization_id,
        })
    }

    /// Builds a `service_status_updated` event from the record after the
    /// update and the status it had before.
    #[must_use]
    pub fn service_status_updated(
        service: &ServiceRecord,
        old_status: ServiceStatus,
        message: String,
    ) -> Self {
        Self::ServiceStatusUpdated(ServiceStatusUpdated {
            service_id: service.id,
            service_name: service.name.clone(),
            old_status,
            new_status: service.status,
            message,
            organization_id: service.organization_id,
        })
    }

    /// Builds a `service_deleted` event.
    #[must_use]
    pub fn service_deleted(service: &ServiceRecord) -> Self {
        Self::ServiceDeleted(ServiceDeleted {
            service_id: service.id,
            service_name: service.name.clone(),
            organization_id: service.organization_id,
        })
    }

    /// Builds an `incident_created` event.
    #[must_use]
    pub fn incident_created(incident: &IncidentRecord) -> Self {
        Self::IncidentCreated(IncidentCreated {
            incident_id: incident.id,
            incident_title: incident.title.clone(),
            incident_desc: incident.description.clone(),
            incident_status: incident.status,
            incident_type: incident.incident_type.clone(),
            organization_id: incident.organization_id,
            affected_services: incident.affected_services.clone(),
        })
    }

    /// Builds an `incident_updated` event from the record after the update
    /// and the status it had before.
    #[must_use]
    pub fn incident_updated(incident: &IncidentRecord, old_status: IncidentStatus) -> Self {
        Self::IncidentUpdated(IncidentUpdated {
            incident_id: incident.id,
            incident_title: incident.title.clone(),
            incident_desc: incident.description.clone(),
            old_status,
            new_status: incident.status,
            incident_type: incident.incident_type.clone(),
            organization_id: incident.organization_id,
            affected_services: incident.affected_services.clone(),
        })
    }

    /// Returns the kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::ServiceCreated(_) => EventKind::ServiceCreated,
            Self::ServiceStatusUpdated(_) => EventKind::ServiceStatusUpdated,
            Self::ServiceDeleted(_) => EventKind::ServiceDeleted,
            Self::IncidentCreated(_) => EventKind::IncidentCreated,
            Self::IncidentUpdated(_) => EventKind::IncidentUpdated,
        }
    }

    /// Returns the tenant the change belongs to.
    #[must_use]
    pub const fn organization_id(&self) -> OrganizationId {
        match self {
            Self::ServiceCreated(e) => e.organization_id,
            Self::ServiceStatusUpdated(e) => e.organization_id,
            Self::ServiceDeleted(e) => e.organization_id,
            Self::IncidentCreated(e) => e.organization_id,
            Self::IncidentUpdated(e) => e.organization_id,
        }
    }
}

/// Immutable broadcast message: a [`ChangeEvent`] plus its emission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    event: ChangeEvent,
    emitted_at: i64,
}

impl Envelope {
    /// Wraps `event`, stamping it with the current time.
    #[must_use]
    pub fn new(event: ChangeEvent) -> Self {
        Self::at(event, Utc::now().timestamp())
    }

    /// Wraps `event` with an explicit emission time (seconds since epoch).
    #[must_use]
    pub const fn at(event: ChangeEvent, emitted_at: i64) -> Self {
        Self { event, emitted_at }
    }

    /// Returns the envelope kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.event.kind()
    }

    /// Returns the wrapped event.
    #[must_use]
    pub const fn event(&self) -> &ChangeEvent {
        &self.event
    }

    /// Returns the emission time in seconds since the Unix epoch.
    #[must_use]
    pub const fn emitted_at(&self) -> i64 {
        self.emitted_at
    }
}

#[derive(Serialize)]
struct EnvelopeData<'a> {
    #[serde(flatten)]
    event: &'a ChangeEvent,
    action: EventKind,
    timestamp: i64,
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = self.kind();
        let mut state = serializer.serialize_struct("Envelope", 2)?;
        state.serialize_field("type", &kind)?;
        state.serialize_field(
            "data",
            &EnvelopeData {
                event: &self.event,
                action: kind,
                timestamp: self.emitted_at,
            },
        )?;
        state.end()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn service() -> ServiceRecord {
        ServiceRecord::new(
            OrganizationId::new(),
            "API".to_string(),
            "public api".to_string(),
            "https://api.example.com".to_string(),
        )
    }

    fn to_json(envelope: &Envelope) -> serde_json::Value {
        let Ok(value) = serde_json::to_value(envelope) else {
            panic!("envelope should serialize");
        };
        value
    }

    #[test]
    fn service_created_wire_shape() {
        let svc = service();
        let envelope = Envelope::at(ChangeEvent::service_created(&svc), 1_700_000_000);
        let json = to_json(&envelope);

        assert_eq!(json["type"], "service_created");
        let data = &json["data"];
        assert_eq!(data["service_id"], svc.id.to_string());
        assert_eq!(data["service_name"], "API");
        assert_eq!(data["service_status"], "operational");
        assert_eq!(data["service_desc"], "public api");
        assert_eq!(data["service_url"], "https://api.example.com");
        assert_eq!(data["organization_id"], svc.organization_id.to_string());
        assert_eq!(data["action"], "service_created");
        assert_eq!(data["timestamp"], 1_700_000_000);
    }

    #[test]
    fn status_update_carries_old_and_new() {
        let mut svc = service();
        svc.status = ServiceStatus::MajorOutage;
        let envelope = Envelope::at(
            ChangeEvent::service_status_updated(
                &svc,
                ServiceStatus::Operational,
                "db down".to_string(),
            ),
            1,
        );
        let json = to_json(&envelope);
        assert_eq!(json["type"], "service_status_updated");
        assert_eq!(json["data"]["old_status"], "operational");
        assert_eq!(json["data"]["new_status"], "major_outage");
        assert_eq!(json["data"]["message"], "db down");
    }

    #[test]
    fn service_deleted_has_only_identity_fields() {
        let svc = service();
        let json = to_json(&Envelope::at(ChangeEvent::service_deleted(&svc), 1));
        let Some(data) = json["data"].as_object() else {
            panic!("data must be an object");
        };
        let mut keys: Vec<&str> = data.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "action",
                "organization_id",
                "service_id",
                "service_name",
                "timestamp"
            ]
        );
    }

    #[test]
    fn incident_events_list_affected_services() {
        let affected = ServiceId::new();
        let mut incident = IncidentRecord::open(
            OrganizationId::new(),
            "Elevated errors".to_string(),
            "5xx on checkout".to_string(),
            "outage".to_string(),
            vec![affected],
            "user-1".to_string(),
        );

        let created = to_json(&Envelope::at(ChangeEvent::incident_created(&incident), 1));
        assert_eq!(created["type"], "incident_created");
        assert_eq!(created["data"]["incident_status"], "investigating");
        assert_eq!(created["data"]["incident_type"], "outage");
        assert_eq!(created["data"]["affected_services"][0], affected.to_string());

        incident.status = IncidentStatus::Resolved;
        let updated = to_json(&Envelope::at(
            ChangeEvent::incident_updated(&incident, IncidentStatus::Investigating),
            2,
        ));
        assert_eq!(updated["type"], "incident_updated");
        assert_eq!(updated["data"]["old_status"], "investigating");
        assert_eq!(updated["data"]["new_status"], "resolved");
        assert_eq!(updated["data"]["incident_title"], "Elevated errors");
    }

    #[test]
    fn new_stamps_current_time() {
        let before = Utc::now().timestamp();
        let envelope = Envelope::new(ChangeEvent::service_deleted(&service()));
        assert!(envelope.emitted_at() >= before);
        assert_eq!(envelope.kind(), EventKind::ServiceDeleted);
    }
}
