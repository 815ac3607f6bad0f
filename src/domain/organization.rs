//! Tenant organization record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::OrganizationId;

/// A user's membership in an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Member {
    /// External user identifier.
    pub user_id: String,
    /// Role name (e.g. `"owner"`, `"editor"`).
    pub role: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
}

/// An organization document as stored in the `organizations` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Organization {
    /// Unique organization identifier.
    pub id: OrganizationId,
    /// Display name.
    pub name: String,
    /// URL slug of the public status page.
    pub slug: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Members of the organization.
    #[serde(default)]
    pub members: Vec<Member>,
    /// Soft-delete flag.
    #[serde(default)]
    pub deleted: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last mutation.
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Creates a new organization.
    #[must_use]
    pub fn new(name: String, slug: String, description: String, members: Vec<Member>) -> Self {
        let now = Utc::now();
        Self {
            id: OrganizationId::new(),
            name,
            slug,
            description,
            members,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Returns `true` if `slug` is non-empty and made only of lowercase ASCII
/// letters, digits and single inner dashes.
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
