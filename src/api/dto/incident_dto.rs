//! Incident DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{IncidentRecord, IncidentStatus, ServiceId};
use crate::service::IncidentChanges;

/// Request body for `POST /api/incidents`. New incidents always start
/// `investigating`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateIncidentRequest {
    /// Title (required).
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: String,
    /// Free-form category, e.g. `outage` or `maintenance`.
    #[serde(default, rename = "type")]
    pub incident_type: String,
    /// Services affected by the incident.
    #[serde(default)]
    pub affected_services: Vec<ServiceId>,
}

/// Request body for `PUT /api/incidents/{id}`. Omitted fields keep their
/// stored value.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateIncidentRequest {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New status. `resolved` stamps `resolved_at`.
    #[serde(default)]
    pub status: Option<IncidentStatus>,
    /// New category.
    #[serde(default, rename = "type")]
    pub incident_type: Option<String>,
    /// New list of affected services.
    #[serde(default)]
    pub affected_services: Option<Vec<ServiceId>>,
}

impl From<UpdateIncidentRequest> for IncidentChanges {
    fn from(req: UpdateIncidentRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            status: req.status,
            incident_type: req.incident_type,
            affected_services: req.affected_services,
        }
    }
}

/// Response body carrying one incident.
#[derive(Debug, Serialize, ToSchema)]
pub struct IncidentResponse {
    /// The incident.
    pub incident: IncidentRecord,
}

/// Response body for `GET /api/incidents`.
#[derive(Debug, Serialize, ToSchema)]
pub struct IncidentListResponse {
    /// The tenant's live incidents, newest first.
    pub incidents: Vec<IncidentRecord>,
}
