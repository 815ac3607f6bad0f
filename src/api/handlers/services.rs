//! Service handlers: list, create, status update, soft delete.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, put};
use axum::{Json, Router};

use super::parse_id;
use crate::api::context::RequestContext;
use crate::api::dto::{
    CreateServiceRequest, MessageResponse, ServiceListResponse, ServiceResponse,
    UpdateServiceStatusRequest,
};
use crate::app_state::AppState;
use crate::domain::ServiceId;
use crate::error::{ApiError, ErrorResponse};

/// `GET /api/services` — List the tenant's services.
///
/// # Errors
///
/// Returns [`ApiError`] on authentication or store failure.
#[utoipa::path(
    get,
    path = "/api/services",
    tag = "Services",
    summary = "List services",
    description = "Returns every non-deleted service of the requesting organization.",
    responses(
        (status = 200, description = "Service list", body = ServiceListResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse),
    )
)]
pub async fn list_services(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let services = state.service.list_services(ctx.organization_id).await?;
    Ok(Json(ServiceListResponse { services }))
}

/// `POST /api/services` — Create a service.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] for a blank name.
#[utoipa::path(
    post,
    path = "/api/services",
    tag = "Services",
    summary = "Create a service",
    description = "Creates an operational service and broadcasts `service_created` to every dashboard.",
    request_body = CreateServiceRequest,
    responses(
        (status = 201, description = "Service created", body = ServiceResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    )
)]
pub async fn create_service(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(req): Json<CreateServiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = state
        .service
        .create_service(ctx.organization_id, &req.name, req.description, req.url)
        .await?;
    Ok((StatusCode::CREATED, Json(ServiceResponse { service })))
}

/// `PUT /api/services/{id}/status` — Change a service's status.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] if the tenant has no such service.
#[utoipa::path(
    put,
    path = "/api/services/{id}/status",
    tag = "Services",
    summary = "Update service status",
    description = "Sets the status and broadcasts `service_status_updated` with the old and new status.",
    params(
        ("id" = uuid::Uuid, Path, description = "Service UUID"),
    ),
    request_body = UpdateServiceStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ServiceResponse),
        (status = 404, description = "Service not found", body = ErrorResponse),
    )
)]
pub async fn update_service_status(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateServiceStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ServiceId = parse_id("service", &id)?;
    let service = state
        .service
        .update_service_status(ctx.organization_id, id, req.status, req.message)
        .await?;
    Ok(Json(ServiceResponse { service }))
}

/// `DELETE /api/services/{id}` — Soft-delete a service.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] if the tenant has no such service.
#[utoipa::path(
    delete,
    path = "/api/services/{id}",
    tag = "Services",
    summary = "Delete a service",
    description = "Flags the service as deleted and broadcasts `service_deleted`.",
    params(
        ("id" = uuid::Uuid, Path, description = "Service UUID"),
    ),
    responses(
        (status = 200, description = "Service deleted", body = MessageResponse),
        (status = 404, description = "Service not found", body = ErrorResponse),
    )
)]
pub async fn delete_service(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ServiceId = parse_id("service", &id)?;
    state.service.delete_service(ctx.organization_id, id).await?;
    Ok(Json(MessageResponse::new("service deleted")))
}

/// Service routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services).post(create_service))
        .route("/services/{id}/status", put(update_service_status))
        .route("/services/{id}", delete(delete_service))
}
