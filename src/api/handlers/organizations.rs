//! Organization handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::context::RequestContext;
use crate::api::dto::{CreateOrganizationRequest, OrganizationListResponse, OrganizationResponse};
use crate::app_state::AppState;
use crate::error::{ApiError, ErrorResponse};

/// `GET /api/organizations` — List organizations.
///
/// # Errors
///
/// Returns [`ApiError`] on authentication or store failure.
#[utoipa::path(
    get,
    path = "/api/organizations",
    tag = "Organizations",
    summary = "List organizations",
    responses(
        (status = 200, description = "Organization list", body = OrganizationListResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse),
    )
)]
pub async fn list_organizations(
    State(state): State<AppState>,
    _ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let organizations = state.service.list_organizations().await?;
    Ok(Json(OrganizationListResponse { organizations }))
}

/// `POST /api/organizations` — Create an organization.
///
/// # Errors
///
/// Returns [`ApiError::Conflict`] if the slug is taken.
#[utoipa::path(
    post,
    path = "/api/organizations",
    tag = "Organizations",
    summary = "Create an organization",
    request_body = CreateOrganizationRequest,
    responses(
        (status = 201, description = "Organization created", body = OrganizationResponse),
        (status = 400, description = "Invalid name or slug", body = ErrorResponse),
        (status = 409, description = "Slug already taken", body = ErrorResponse),
    )
)]
pub async fn create_organization(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Json(req): Json<CreateOrganizationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let organization = state
        .service
        .create_organization(&req.name, &req.slug, req.description, req.members)
        .await?;
    Ok((StatusCode::CREATED, Json(OrganizationResponse { organization })))
}

/// Organization routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/organizations",
        get(list_organizations).post(create_organization),
    )
}
