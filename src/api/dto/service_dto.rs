//! Service DTOs for create, list, and status updates.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ServiceRecord, ServiceStatus};

/// Request body for `POST /api/services`. New services always start
/// `operational`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateServiceRequest {
    /// Display name (required).
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: String,
    /// Optional URL of the monitored service.
    #[serde(default)]
    pub url: String,
}

/// Request body for `PUT /api/services/{id}/status`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateServiceStatusRequest {
    /// New status.
    pub status: ServiceStatus,
    /// Optional operator note carried in the broadcast.
    #[serde(default)]
    pub message: String,
}

/// Response body carrying one service.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceResponse {
    /// The service.
    pub service: ServiceRecord,
}

/// Response body for `GET /api/services`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceListResponse {
    /// The tenant's live services.
    pub services: Vec<ServiceRecord>,
}
