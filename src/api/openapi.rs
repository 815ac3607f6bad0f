//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::handlers;

/// Generated OpenAPI description of every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "status-hub",
        description = "Multi-tenant status page API. Every committed service or incident change is also pushed to `/ws` subscribers."
    ),
    paths(
        handlers::system::health_handler,
        handlers::organizations::list_organizations,
        handlers::organizations::create_organization,
        handlers::services::list_services,
        handlers::services::create_service,
        handlers::services::update_service_status,
        handlers::services::delete_service,
        handlers::incidents::list_incidents,
        handlers::incidents::create_incident,
        handlers::incidents::update_incident,
        handlers::public::public_status,
    ),
    tags(
        (name = "System", description = "Health"),
        (name = "Organizations", description = "Tenants"),
        (name = "Services", description = "Monitored services"),
        (name = "Incidents", description = "Incident lifecycle"),
        (name = "Public", description = "Unauthenticated status pages"),
    )
)]
pub struct ApiDoc;
