//! Organization DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Member, Organization};

/// Request body for `POST /api/organizations`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrganizationRequest {
    /// Display name.
    pub name: String,
    /// URL slug for the public status page (lowercase letters, digits, `-`).
    pub slug: String,
    /// Optional description.
    #[serde(default)]
    pub description: String,
    /// Initial members.
    #[serde(default)]
    pub members: Vec<Member>,
}

/// Response body for `POST /api/organizations` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct OrganizationResponse {
    /// The created organization.
    pub organization: Organization,
}

/// Response body for `GET /api/organizations`.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrganizationListResponse {
    /// All live organizations.
    pub organizations: Vec<Organization>,
}
