//! Per-request caller identity and tenant.
//!
//! [`RequestContext`] is an extractor: any handler that takes one requires
//! a valid bearer token (or anonymous access) and resolves the tenant from
//! the `X-Organization-ID` header.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::config::AuthConfig;
use crate::domain::OrganizationId;
use crate::error::ApiError;

/// Header naming the tenant a request acts on.
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// Authenticated caller and the tenant it acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Caller's user id.
    pub user_id: String,
    /// Tenant every lookup and mutation is scoped to.
    pub organization_id: OrganizationId,
}

impl RequestContext {
    /// Resolves the caller and tenant from request headers.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for a wrong or missing token
    /// (when anonymous access is off), or
    /// [`ApiError::InvalidOrganizationId`] for a malformed tenant header.
    pub fn resolve(headers: &HeaderMap, auth: &AuthConfig) -> Result<Self, ApiError> {
        let user_id = match headers.get("authorization") {
            None if auth.allow_anonymous => auth.user_id.clone(),
            None => return Err(ApiError::Unauthorized),
            Some(value) => {
                let token = value
                    .to_str()
                    .ok()
                    .and_then(|v| v.strip_prefix("Bearer "))
                    .ok_or(ApiError::Unauthorized)?;
                if token != auth.token {
                    return Err(ApiError::Unauthorized);
                }
                auth.user_id.clone()
            }
        };

        let organization_id = match headers.get(ORGANIZATION_HEADER) {
            None => auth.default_organization_id,
            Some(value) => {
                let raw = value.to_str().unwrap_or_default();
                raw.parse()
                    .map_err(|_| ApiError::InvalidOrganizationId(raw.to_string()))?
            }
        };

        Ok(Self {
            user_id,
            organization_id,
        })
    }
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Self::resolve(&parts.headers, &state.auth)
    }
}
