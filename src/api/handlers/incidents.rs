//! Incident handlers: list, open, update.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};

use super::parse_id;
use crate::api::context::RequestContext;
use crate::api::dto::{
    CreateIncidentRequest, IncidentListResponse, IncidentResponse, UpdateIncidentRequest,
};
use crate::app_state::AppState;
use crate::domain::IncidentId;
use crate::error::{ApiError, ErrorResponse};

/// `GET /api/incidents` — List the tenant's incidents, newest first.
///
/// # Errors
///
/// Returns [`ApiError`] on authentication or store failure.
#[utoipa::path(
    get,
    path = "/api/incidents",
    tag = "Incidents",
    summary = "List incidents",
    responses(
        (status = 200, description = "Incident list", body = IncidentListResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse),
    )
)]
pub async fn list_incidents(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let incidents = state.service.list_incidents(ctx.organization_id).await?;
    Ok(Json(IncidentListResponse { incidents }))
}

/// `POST /api/incidents` — Open an incident.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] for a blank title.
#[utoipa::path(
    post,
    path = "/api/incidents",
    tag = "Incidents",
    summary = "Open an incident",
    description = "Creates an incident in the `investigating` state and broadcasts `incident_created`.",
    request_body = CreateIncidentRequest,
    responses(
        (status = 201, description = "Incident created", body = IncidentResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    )
)]
pub async fn create_incident(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(req): Json<CreateIncidentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let incident = state
        .service
        .create_incident(
            ctx.organization_id,
            &ctx.user_id,
            &req.title,
            req.description,
            req.incident_type,
            req.affected_services,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(IncidentResponse { incident })))
}

/// `PUT /api/incidents/{id}` — Update an incident.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] if the tenant has no such incident.
#[utoipa::path(
    put,
    path = "/api/incidents/{id}",
    tag = "Incidents",
    summary = "Update an incident",
    description = "Applies the supplied fields and broadcasts `incident_updated` with the old and new status.",
    params(
        ("id" = uuid::Uuid, Path, description = "Incident UUID"),
    ),
    request_body = UpdateIncidentRequest,
    responses(
        (status = 200, description = "Incident updated", body = IncidentResponse),
        (status = 404, description = "Incident not found", body = ErrorResponse),
    )
)]
pub async fn update_incident(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateIncidentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id: IncidentId = parse_id("incident", &id)?;
    let incident = state
        .service
        .update_incident(ctx.organization_id, id, req.into())
        .await?;
    Ok(Json(IncidentResponse { incident }))
}

/// Incident routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/incidents", get(list_incidents).post(create_incident))
        .route("/incidents/{id}", put(update_incident))
}
