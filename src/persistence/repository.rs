//! Typed access to organizations, services and incidents.
//!
//! [`StatusRepository`] is the only caller of the [`DocumentStore`]. It
//! bounds every store call with a fixed timeout, converts documents to
//! records, and wraps each successful write in a [`Committed`] token.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Collection, Committed, Document, DocumentStore, Filter, StoreError};
use crate::domain::{
    IncidentId, IncidentRecord, Organization, OrganizationId, ServiceId, ServiceRecord,
};

/// Typed repository over a [`DocumentStore`].
#[derive(Debug, Clone)]
pub struct StatusRepository {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl StatusRepository {
    /// Creates a repository whose store calls fail after `timeout`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Lists all live organizations.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on store failure or timeout.
    pub async fn organizations(&self) -> Result<Vec<Organization>, StoreError> {
        self.find_all(Collection::Organizations, &Filter::new().live())
            .await
    }

    /// Finds a live organization by slug.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on store failure or timeout.
    pub async fn organization_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Organization>, StoreError> {
        let mut found = self
            .find_all(Collection::Organizations, &Filter::new().slug(slug).live().limit(1))
            .await?;
        Ok(found.pop())
    }

    /// Persists a new organization.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on store failure or timeout.
    pub async fn insert_organization(
        &self,
        organization: Organization,
    ) -> Result<Committed<Organization>, StoreError> {
        let id = *organization.id.as_uuid();
        self.insert(Collection::Organizations, id, organization).await
    }

    /// Lists a tenant's live services in creation order.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on store failure or timeout.
    pub async fn services(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<ServiceRecord>, StoreError> {
        self.find_all(
            Collection::Services,
            &Filter::new().organization(organization_id).live(),
        )
        .await
    }

    /// Loads one of a tenant's live services.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the service does not exist, is
    /// deleted, or belongs to another tenant.
    pub async fn service(
        &self,
        organization_id: OrganizationId,
        id: ServiceId,
    ) -> Result<ServiceRecord, StoreError> {
        let filter = Filter::new().id(id).organization(organization_id).live();
        self.find_one(Collection::Services, &filter, id.to_string())
            .await
    }

    /// Persists a new service.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on store failure or timeout.
    pub async fn insert_service(
        &self,
        service: ServiceRecord,
    ) -> Result<Committed<ServiceRecord>, StoreError> {
        let id = *service.id.as_uuid();
        self.insert(Collection::Services, id, service).await
    }

    /// Writes `fields` of `service` back to the store, provided the stored
    /// service still belongs to the same tenant and is not deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no live document matched (for
    /// instance because a concurrent request deleted it), or another
    /// [`StoreError`] on store failure or timeout.
    pub async fn update_service(
        &self,
        service: ServiceRecord,
        fields: &[&str],
    ) -> Result<Committed<ServiceRecord>, StoreError> {
        let filter = Filter::new()
            .id(service.id)
            .organization(service.organization_id)
            .live();
        self.update(Collection::Services, &filter, service, fields)
            .await
    }

    /// Lists a tenant's live incidents, newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on store failure or timeout.
    pub async fn incidents(
        &self,
        organization_id: OrganizationId,
        limit: Option<usize>,
    ) -> Result<Vec<IncidentRecord>, StoreError> {
        let mut filter = Filter::new()
            .organization(organization_id)
            .live()
            .newest_first();
        filter.limit = limit;
        self.find_all(Collection::Incidents, &filter).await
    }

    /// Loads one of a tenant's live incidents.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the incident does not exist, is
    /// deleted, or belongs to another tenant.
    pub async fn incident(
        &self,
        organization_id: OrganizationId,
        id: IncidentId,
    ) -> Result<IncidentRecord, StoreError> {
        let filter = Filter::new().id(id).organization(organization_id).live();
        self.find_one(Collection::Incidents, &filter, id.to_string())
            .await
    }

    /// Persists a new incident.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on store failure or timeout.
    pub async fn insert_incident(
        &self,
        incident: IncidentRecord,
    ) -> Result<Committed<IncidentRecord>, StoreError> {
        let id = *incident.id.as_uuid();
        self.insert(Collection::Incidents, id, incident).await
    }

    /// Writes `fields` of `incident` back to the store, provided the stored
    /// incident still belongs to the same tenant and is not deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no live document matched, or
    /// another [`StoreError`] on store failure or timeout.
    pub async fn update_incident(
        &self,
        incident: IncidentRecord,
        fields: &[&str],
    ) -> Result<Committed<IncidentRecord>, StoreError> {
        let filter = Filter::new()
            .id(incident.id)
            .organization(incident.organization_id)
            .live();
        self.update(Collection::Incidents, &filter, incident, fields)
            .await
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }

    async fn find_all<T: DeserializeOwned>(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<T>, StoreError> {
        let documents = self.bounded(self.store.find(collection, filter)).await?;
        documents.into_iter().map(from_document).collect()
    }

    async fn find_one<T: DeserializeOwned>(
        &self,
        collection: Collection,
        filter: &Filter,
        key: String,
    ) -> Result<T, StoreError> {
        let mut found = self.find_all(collection, filter).await?;
        found.pop().ok_or(StoreError::NotFound {
            collection,
            id: key,
        })
    }

    async fn insert<T: Serialize>(
        &self,
        collection: Collection,
        id: uuid::Uuid,
        record: T,
    ) -> Result<Committed<T>, StoreError> {
        let document = to_document(&record)?;
        self.bounded(self.store.insert(collection, id, document))
            .await?;
        Ok(Committed::new(record))
    }

    async fn update<T: Serialize>(
        &self,
        collection: Collection,
        filter: &Filter,
        record: T,
        fields: &[&str],
    ) -> Result<Committed<T>, StoreError> {
        let mut document = to_document(&record)?;
        document.retain(|key, _| fields.contains(&key.as_str()));

        let matched = self
            .bounded(self.store.update_fields(collection, filter, document))
            .await?;
        if matched == 0 {
            return Err(StoreError::NotFound {
                collection,
                id: filter.id.map(|id| id.to_string()).unwrap_or_default(),
            });
        }
        Ok(Committed::new(record))
    }
}

fn to_document<T: Serialize>(record: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(record) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Codec(format!(
            "record did not serialize to an object: {other}"
        ))),
        Err(e) => Err(StoreError::Codec(e.to_string())),
    }
}

fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::Object(document))
        .map_err(|e| StoreError::Codec(e.to_string()))
}
