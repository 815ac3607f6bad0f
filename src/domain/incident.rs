//! Incident record and its lifecycle status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{IncidentId, OrganizationId, ServiceId};

/// Progress of an incident from detection to resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// The problem was reported and is being looked at.
    #[default]
    Investigating,
    /// Root cause found.
    Identified,
    /// A fix is deployed and being watched.
    Monitoring,
    /// Closed.
    Resolved,
}

impl IncidentStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Investigating => "investigating",
            Self::Identified => "identified",
            Self::Monitoring => "monitoring",
            Self::Resolved => "resolved",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An incident document as stored in the `incidents` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IncidentRecord {
    /// Unique incident identifier.
    pub id: IncidentId,
    /// Owning tenant.
    pub organization_id: OrganizationId,
    /// Short headline.
    pub title: String,
    /// Longer explanation shown on the status page.
    #[serde(default)]
    pub description: String,
    /// Lifecycle status.
    pub status: IncidentStatus,
    /// Free-form category (e.g. `"outage"`, `"maintenance"`).
    #[serde(rename = "type", default)]
    pub incident_type: String,
    /// Services impacted by the incident.
    #[serde(default)]
    pub affected_services: Vec<ServiceId>,
    /// Soft-delete flag.
    #[serde(default)]
    pub deleted: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last mutation.
    pub updated_at: DateTime<Utc>,
    /// User that opened the incident.
    #[serde(default)]
    pub created_by: String,
    /// Set when the incident transitions to [`IncidentStatus::Resolved`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl IncidentRecord {
    /// Opens a new incident in the `investigating` state.
    #[must_use]
    pub fn open(
        organization_id: OrganizationId,
        title: String,
        description: String,
        incident_type: String,
        affected_services: Vec<ServiceId>,
        created_by: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: IncidentId::new(),
            organization_id,
            title,
            description,
            status: IncidentStatus::Investigating,
            incident_type,
            affected_services,
            deleted: false,
            created_at: now,
            updated_at: now,
            created_by,
            resolved_at: None,
        }
    }
}
