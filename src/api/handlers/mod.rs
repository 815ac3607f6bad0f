//! REST endpoint handlers organized by resource.

pub mod incidents;
pub mod organizations;
pub mod public;
pub mod services;
pub mod system;

use std::str::FromStr;

use axum::Router;

use crate::app_state::AppState;
use crate::error::ApiError;

/// Composes the protected resource routes, mounted under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(organizations::routes())
        .merge(services::routes())
        .merge(incidents::routes())
}

/// Parses a path identifier, reporting a malformed one as a bad request.
fn parse_id<T: FromStr>(resource: &str, raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::InvalidRequest(format!("invalid {resource} id: {raw}")))
}
