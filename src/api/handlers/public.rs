//! Unauthenticated status page endpoint.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::error::{ApiError, ErrorResponse};
use crate::service::PublicStatus;

/// `GET /api/public/status/{slug}` — Public status page data.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] for an unknown slug.
#[utoipa::path(
    get,
    path = "/api/public/status/{slug}",
    tag = "Public",
    summary = "Public status page",
    description = "Returns the organization, its services, and its ten most recent incidents.",
    params(
        ("slug" = String, Path, description = "Organization slug"),
    ),
    responses(
        (status = 200, description = "Status page", body = PublicStatus),
        (status = 404, description = "Organization not found", body = ErrorResponse),
    )
)]
pub async fn public_status(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.public_status(&slug).await?))
}

/// Public routes, mounted under `/api/public`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/status/{slug}", get(public_status))
}
