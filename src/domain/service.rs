//! Monitored service record and its operational status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{OrganizationId, ServiceId};

/// Operational status shown for a service on the status page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Everything works.
    #[default]
    Operational,
    /// Slower than usual but functional.
    DegradedPerformance,
    /// Some users or regions are affected.
    PartialOutage,
    /// The service is down.
    MajorOutage,
    /// Planned maintenance window.
    Maintenance,
}

impl ServiceStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Operational => "operational",
            Self::DegradedPerformance => "degraded_performance",
            Self::PartialOutage => "partial_outage",
            Self::MajorOutage => "major_outage",
            Self::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A service document as stored in the `services` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ServiceRecord {
    /// Unique service identifier.
    pub id: ServiceId,
    /// Owning tenant.
    pub organization_id: OrganizationId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Current operational status.
    pub status: ServiceStatus,
    /// Public URL of the service, may be empty.
    #[serde(default)]
    pub url: String,
    /// Soft-delete flag. Deleted services are hidden from every read.
    #[serde(default)]
    pub deleted: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last mutation.
    pub updated_at: DateTime<Utc>,
}

impl ServiceRecord {
    /// Creates a new operational service owned by `organization_id`.
    #[must_use]
    pub fn new(
        organization_id: OrganizationId,
        name: String,
        description: String,
        url: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ServiceId::new(),
            organization_id,
            name,
            description,
            status: ServiceStatus::Operational,
            url,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}
