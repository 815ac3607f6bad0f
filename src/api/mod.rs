//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Protected endpoints are mounted under `/api` and take a
//! [`RequestContext`](context::RequestContext); the public status page
//! lives under `/api/public`, next to `/health` and the `/ws` upgrade.

pub mod context;
pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::config::AppConfig;
use crate::ws::handler::ws_handler;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api", handlers::routes())
        .nest("/api/public", handlers::public::routes())
        .merge(handlers::system::routes())
        .merge(docs_router())
}

/// Builds the full application: REST, WebSocket upgrade, and middleware.
pub fn build_app(state: AppState, config: &AppConfig) -> Router {
    build_router()
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(config.request_timeout()))
        .with_state(state)
}

#[cfg(feature = "swagger-ui")]
fn docs_router() -> Router<AppState> {
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    Router::new().merge(
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn docs_router() -> Router<AppState> {
    use utoipa::OpenApi;

    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { axum::Json(openapi::ApiDoc::openapi()) }),
    )
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::persistence::{MemoryStore, StatusRepository};
    use crate::service::{Notifier, StatusService};
    use crate::ws::{Hub, HubConfig};

    fn app() -> Router {
        let config = AppConfig::default();
        let repository = StatusRepository::new(Arc::new(MemoryStore::new()), Duration::from_secs(5));
        let notifier = Notifier::new(Hub::spawn(HubConfig::default()));
        let state = AppState::new(StatusService::new(repository, notifier), config.auth.clone());
        build_app(state, &config)
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", "Bearer test");
        let result = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };
        let Ok(request) = result else {
            panic!("invalid test request");
        };
        request
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let Ok(response) = app.clone().oneshot(request).await else {
            panic!("router is infallible");
        };
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body read failed");
        };
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn service_crud_over_http() {
        let app = app();
        let (status, body) = call(
            &app,
            request("POST", "/api/services", Some(json!({"name": "API"}))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["service"]["status"], "operational");
        let Some(id) = body["service"]["id"].as_str().map(str::to_string) else {
            panic!("missing service id");
        };

        let (status, body) = call(
            &app,
            request(
                "PUT",
                &format!("/api/services/{id}/status"),
                Some(json!({"status": "partial_outage", "message": "slow"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"]["status"], "partial_outage");

        let (status, body) = call(&app, request("GET", "/api/services", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["services"].as_array().map(Vec::len), Some(1));

        let (status, _) = call(&app, request("DELETE", &format!("/api/services/{id}"), None)).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = call(&app, request("GET", "/api/services", None)).await;
        assert_eq!(body["services"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn foreign_tenant_gets_not_found() {
        let app = app();
        let (_, body) = call(
            &app,
            request("POST", "/api/services", Some(json!({"name": "API"}))),
        )
        .await;
        let Some(id) = body["service"]["id"].as_str().map(str::to_string) else {
            panic!("missing service id");
        };

        let mut req = request(
            "PUT",
            &format!("/api/services/{id}/status"),
            Some(json!({"status": "major_outage"})),
        );
        let Ok(header) = "6f1c2a4e-8a5b-4d3c-9e2f-1a2b3c4d5e6f".parse::<axum::http::HeaderValue>() else {
            panic!("header value");
        };
        req.headers_mut().insert(context::ORGANIZATION_HEADER, header);
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], 2001);
    }

    #[tokio::test]
    async fn rejects_bad_token_and_bad_ids() {
        let app = app();
        let Ok(req) = Request::builder()
            .uri("/api/services")
            .header("authorization", "Bearer wrong")
            .body(Body::empty())
        else {
            panic!("invalid test request");
        };
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], 401);

        let (status, body) = call(&app, request("DELETE", "/api/services/not-a-uuid", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], 1001);
    }

    #[tokio::test]
    async fn incident_update_keeps_omitted_fields() {
        let app = app();
        let (status, body) = call(
            &app,
            request(
                "POST",
                "/api/incidents",
                Some(json!({"title": "Checkout errors", "type": "outage"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["incident"]["status"], "investigating");
        assert_eq!(body["incident"]["created_by"], "test_user_123");
        let Some(id) = body["incident"]["id"].as_str().map(str::to_string) else {
            panic!("missing incident id");
        };

        let (status, body) = call(
            &app,
            request(
                "PUT",
                &format!("/api/incidents/{id}"),
                Some(json!({"status": "resolved"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["incident"]["title"], "Checkout errors");
        assert_eq!(body["incident"]["type"], "outage");
        assert!(body["incident"]["resolved_at"].is_string());
    }

    #[tokio::test]
    async fn public_page_and_health() {
        let app = app();
        let (status, _) = call(
            &app,
            request(
                "POST",
                "/api/organizations",
                Some(json!({"name": "Acme", "slug": "acme"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = call(
            &app,
            request(
                "POST",
                "/api/organizations",
                Some(json!({"name": "Acme again", "slug": "acme"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let Ok(req) = Request::builder()
            .uri("/api/public/status/acme")
            .body(Body::empty())
        else {
            panic!("invalid test request");
        };
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["organization"]["slug"], "acme");
        assert!(body["incidents"].is_array());

        let (status, _) = call(&app, request("GET", "/api/public/status/globex", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(&app, request("GET", "/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["hub"]["connections"], 0);
    }
}
