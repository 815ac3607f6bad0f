//! Status service: orchestrates tenant CRUD and emits change events.

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use super::Notifier;
use crate::domain::organization::is_valid_slug;
use crate::domain::{
    ChangeEvent, IncidentId, IncidentRecord, IncidentStatus, Member, Organization, OrganizationId,
    ServiceId, ServiceRecord, ServiceStatus,
};
use crate::error::ApiError;
use crate::persistence::StatusRepository;

/// Number of incidents shown on a public status page.
pub const PUBLIC_INCIDENT_LIMIT: usize = 10;

/// Fields of an incident that an update may change. `None` keeps the
/// stored value.
#[derive(Debug, Clone, Default)]
pub struct IncidentChanges {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New status.
    pub status: Option<IncidentStatus>,
    /// New category.
    pub incident_type: Option<String>,
    /// New list of affected services.
    pub affected_services: Option<Vec<ServiceId>>,
}

/// Everything a public status page shows for one organization.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicStatus {
    /// The organization.
    pub organization: Organization,
    /// Its live services.
    pub services: Vec<ServiceRecord>,
    /// Its most recent live incidents, newest first.
    pub incidents: Vec<IncidentRecord>,
}

/// Orchestration layer for all status-page operations.
///
/// Every mutation follows the same pattern: load prior state if the event
/// needs it → persist through the repository → hand the committed change
/// to the [`Notifier`] → return the record. A failed write returns early,
/// so nothing is broadcast for it.
#[derive(Debug, Clone)]
pub struct StatusService {
    repository: StatusRepository,
    notifier: Notifier,
}

impl StatusService {
    /// Creates a new `StatusService`.
    #[must_use]
    pub fn new(repository: StatusRepository, notifier: Notifier) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Returns a reference to the inner [`Notifier`].
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Lists all organizations.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on store failure.
    pub async fn list_organizations(&self) -> Result<Vec<Organization>, ApiError> {
        Ok(self.repository.organizations().await?)
    }

    /// Creates an organization with a unique slug.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] for a blank name or malformed
    /// slug, [`ApiError::Conflict`] if the slug is taken, or
    /// [`ApiError::Persistence`] on store failure.
    pub async fn create_organization(
        &self,
        name: &str,
        slug: &str,
        description: String,
        members: Vec<Member>,
    ) -> Result<Organization, ApiError> {
        let name = required("name", name)?;
        let slug = slug.trim();
        if !is_valid_slug(slug) {
            return Err(ApiError::InvalidRequest(format!(
                "slug must be lowercase letters, digits and dashes: {slug:?}"
            )));
        }
        if self.repository.organization_by_slug(slug).await?.is_some() {
            return Err(ApiError::Conflict(format!("slug {slug} is already taken")));
        }

        let organization = Organization::new(name, slug.to_string(), description, members);
        let organization = self
            .repository
            .insert_organization(organization)
            .await?
            .into_inner();

        tracing::info!(organization_id = %organization.id, slug, "organization created");
        Ok(organization)
    }

    /// Lists a tenant's live services.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on store failure.
    pub async fn list_services(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<ServiceRecord>, ApiError> {
        Ok(self.repository.services(organization_id).await?)
    }

    /// Creates an operational service and broadcasts `service_created`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] for a blank name or
    /// [`ApiError::Persistence`] on store failure.
    pub async fn create_service(
        &self,
        organization_id: OrganizationId,
        name: &str,
        description: String,
        url: String,
    ) -> Result<ServiceRecord, ApiError> {
        let name = required("name", name)?;
        let record = ServiceRecord::new(organization_id, name, description, url);

        let committed = self.repository.insert_service(record).await?;
        let service = committed.get().clone();
        self.notifier
            .notify(committed.map(|s| ChangeEvent::service_created(&s)))
            .await;

        tracing::info!(service_id = %service.id, %organization_id, "service created");
        Ok(service)
    }

    /// Sets a service's status and broadcasts `service_status_updated`
    /// with the previous and new status.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the tenant has no such live
    /// service, or [`ApiError::Persistence`] on store failure.
    pub async fn update_service_status(
        &self,
        organization_id: OrganizationId,
        service_id: ServiceId,
        status: ServiceStatus,
        message: String,
    ) -> Result<ServiceRecord, ApiError> {
        let mut service = self.repository.service(organization_id, service_id).await?;
        let old_status = service.status;
        service.status = status;
        service.updated_at = Utc::now();

        let committed = self
            .repository
            .update_service(service, &["status", "updated_at"])
            .await?;
        let service = committed.get().clone();
        self.notifier
            .notify(committed.map(|s| ChangeEvent::service_status_updated(&s, old_status, message)))
            .await;

        tracing::info!(%service_id, %old_status, new_status = %status, "service status updated");
        Ok(service)
    }

    /// Soft-deletes a service and broadcasts `service_deleted`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the tenant has no such live
    /// service, or [`ApiError::Persistence`] on store failure.
    pub async fn delete_service(
        &self,
        organization_id: OrganizationId,
        service_id: ServiceId,
    ) -> Result<(), ApiError> {
        let mut service = self.repository.service(organization_id, service_id).await?;
        service.deleted = true;
        service.updated_at = Utc::now();

        let committed = self
            .repository
            .update_service(service, &["deleted", "updated_at"])
            .await?;
        self.notifier
            .notify(committed.map(|s| ChangeEvent::service_deleted(&s)))
            .await;

        tracing::info!(%service_id, %organization_id, "service deleted");
        Ok(())
    }

    /// Lists a tenant's live incidents, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on store failure.
    pub async fn list_incidents(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<IncidentRecord>, ApiError> {
        Ok(self.repository.incidents(organization_id, None).await?)
    }

    /// Opens an incident in the `investigating` state and broadcasts
    /// `incident_created`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] for a blank title or
    /// [`ApiError::Persistence`] on store failure.
    pub async fn create_incident(
        &self,
        organization_id: OrganizationId,
        created_by: &str,
        title: &str,
        description: String,
        incident_type: String,
        affected_services: Vec<ServiceId>,
    ) -> Result<IncidentRecord, ApiError> {
        let title = required("title", title)?;
        let record = IncidentRecord::open(
            organization_id,
            title,
            description,
            incident_type,
            affected_services,
            created_by.to_string(),
        );

        let committed = self.repository.insert_incident(record).await?;
        let incident = committed.get().clone();
        self.notifier
            .notify(committed.map(|i| ChangeEvent::incident_created(&i)))
            .await;

        tracing::info!(incident_id = %incident.id, %organization_id, "incident created");
        Ok(incident)
    }

    /// Applies `changes` to an incident and broadcasts `incident_updated`
    /// with the previous and new status. Resolving stamps `resolved_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] for a blank title,
    /// [`ApiError::NotFound`] if the tenant has no such live incident, or
    /// [`ApiError::Persistence`] on store failure.
    pub async fn update_incident(
        &self,
        organization_id: OrganizationId,
        incident_id: IncidentId,
        changes: IncidentChanges,
    ) -> Result<IncidentRecord, ApiError> {
        let mut incident = self
            .repository
            .incident(organization_id, incident_id)
            .await?;
        let old_status = incident.status;
        let now = Utc::now();

        if let Some(title) = changes.title {
            incident.title = required("title", &title)?;
        }
        if let Some(description) = changes.description {
            incident.description = description;
        }
        if let Some(status) = changes.status {
            incident.status = status;
            if status == IncidentStatus::Resolved {
                incident.resolved_at = Some(now);
            }
        }
        if let Some(incident_type) = changes.incident_type {
            incident.incident_type = incident_type;
        }
        if let Some(affected) = changes.affected_services {
            incident.affected_services = affected;
        }
        incident.updated_at = now;

        let committed = self
            .repository
            .update_incident(
                incident,
                &[
                    "title",
                    "description",
                    "status",
                    "type",
                    "affected_services",
                    "updated_at",
                    "resolved_at",
                ],
            )
            .await?;
        let incident = committed.get().clone();
        self.notifier
            .notify(committed.map(|i| ChangeEvent::incident_updated(&i, old_status)))
            .await;

        tracing::info!(%incident_id, %old_status, new_status = %incident.status, "incident updated");
        Ok(incident)
    }

    /// Assembles the public status page for `slug`.
    ///
    /// Failing to load incidents degrades to an empty list rather than
    /// failing the page.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown slug, or
    /// [`ApiError::Persistence`] if the organization or its services
    /// cannot be loaded.
    pub async fn public_status(&self, slug: &str) -> Result<PublicStatus, ApiError> {
        let organization = self
            .repository
            .organization_by_slug(slug)
            .await?
            .ok_or_else(|| ApiError::NotFound {
                resource: "organization",
                id: slug.to_string(),
            })?;

        let services = self.repository.services(organization.id).await?;
        let incidents = match self
            .repository
            .incidents(organization.id, Some(PUBLIC_INCIDENT_LIMIT))
            .await
        {
            Ok(incidents) => incidents,
            Err(e) => {
                tracing::warn!(slug, error = %e, "continuing without incidents");
                Vec::new()
            }
        };

        Ok(PublicStatus {
            organization,
            services,
            incidents,
        })
    }
}

/// Trims `value` and rejects it if empty.
fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidRequest(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}
