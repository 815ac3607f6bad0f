//! Persistence layer: document store collaborator and typed repository.
//!
//! The store is a plain document database offering filter-based reads,
//! inserts and field-set updates over three collections. Two backends are
//! provided: [`MemoryStore`] and [`PostgresStore`] (JSONB documents via
//! `sqlx`). [`StatusRepository`] adds the per-call timeout, typed record
//! (de)serialization, and mints the [`Committed`] tokens that gate every
//! broadcast.

pub mod committed;
pub mod memory;
pub mod postgres;
pub mod repository;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::OrganizationId;

pub use committed::Committed;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use repository::StatusRepository;

/// A stored document: a JSON object with at least an `id` field.
pub type Document = serde_json::Map<String, Value>;

/// Collections known to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Tenant organizations.
    Organizations,
    /// Monitored services.
    Services,
    /// Incidents.
    Incidents,
}

impl Collection {
    /// Returns the collection name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Organizations => "organizations",
            Self::Services => "services",
            Self::Incidents => "incidents",
        }
    }

    /// Returns the singular name of a record in this collection.
    #[must_use]
    pub const fn record_name(&self) -> &'static str {
        match self {
            Self::Organizations => "organization",
            Self::Services => "service",
            Self::Incidents => "incident",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store failures, kept distinct so callers never have to inspect strings.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No document matched.
    #[error("{collection} document {id} not found")]
    NotFound {
        /// Collection that was searched.
        collection: Collection,
        /// Identifier or key that was looked up.
        id: String,
    },

    /// A uniqueness constraint (id or organization slug) was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The operation did not finish within the configured timeout.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// The backend reported an error.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A document could not be converted to or from a record.
    #[error("document codec error: {0}")]
    Codec(String),
}

/// Document selection criteria. All set criteria must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Match on the `id` field.
    pub id: Option<uuid::Uuid>,
    /// Match on the `organization_id` field.
    pub organization_id: Option<OrganizationId>,
    /// Match on the `slug` field.
    pub slug: Option<String>,
    /// Skip documents whose `deleted` flag is `true`.
    pub exclude_deleted: bool,
    /// Order by `created_at`, newest first. Otherwise insertion order.
    pub newest_first: bool,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl Filter {
    /// Matches every document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to the document with this id.
    #[must_use]
    pub fn id(mut self, id: impl Into<uuid::Uuid>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Restricts to one tenant.
    #[must_use]
    pub fn organization(mut self, organization_id: OrganizationId) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    /// Restricts to the document with this slug.
    #[must_use]
    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Hides soft-deleted documents.
    #[must_use]
    pub fn live(mut self) -> Self {
        self.exclude_deleted = true;
        self
    }

    /// Orders by `created_at` descending.
    #[must_use]
    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    /// Caps the number of returned documents.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns `true` if `document` satisfies every criterion except
    /// ordering and limit.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        if let Some(id) = self.id
            && uuid_field(document, "id") != Some(id)
        {
            return false;
        }
        if let Some(org) = self.organization_id
            && uuid_field(document, "organization_id") != Some(*org.as_uuid())
        {
            return false;
        }
        if let Some(slug) = &self.slug
            && document.get("slug").and_then(Value::as_str) != Some(slug.as_str())
        {
            return false;
        }
        !(self.exclude_deleted && is_deleted(document))
    }
}

/// Reads a UUID-valued string field.
fn uuid_field(document: &Document, key: &str) -> Option<uuid::Uuid> {
    document
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| uuid::Uuid::parse_str(s).ok())
}

/// A missing `deleted` field counts as not deleted.
fn is_deleted(document: &Document) -> bool {
    document
        .get("deleted")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Reads the `created_at` timestamp of a document.
pub(crate) fn created_at(document: &Document) -> Option<DateTime<Utc>> {
    document
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
}

/// Filter-based document store over the known [`Collection`]s.
#[async_trait]
pub trait DocumentStore: fmt::Debug + Send + Sync {
    /// Returns the documents of `collection` matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on backend failure.
    async fn find(&self, collection: Collection, filter: &Filter)
    -> Result<Vec<Document>, StoreError>;

    /// Inserts a new document under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if `id` is already taken or, for
    /// organizations, if a live organization already uses the slug.
    /// Returns [`StoreError::Backend`] on backend failure.
    async fn insert(
        &self,
        collection: Collection,
        id: uuid::Uuid,
        document: Document,
    ) -> Result<(), StoreError>;

    /// Sets `fields` on the documents matching `filter`, leaving other
    /// fields untouched. The match and the write are one atomic step, so a
    /// document changed concurrently (deleted, say) is no longer matched.
    /// Ordering and limit are ignored. Returns the number of matched
    /// documents.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on backend failure.
    async fn update_fields(
        &self,
        collection: Collection,
        filter: &Filter,
        fields: Document,
    ) -> Result<u64, StoreError>;
}
