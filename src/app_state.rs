//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::AuthConfig;
use crate::service::StatusService;
use crate::ws::Hub;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Status service for all business logic.
    pub service: Arc<StatusService>,
    /// Connection hub for WebSocket clients.
    pub hub: Hub,
    /// REST authentication settings.
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    /// Assembles state from a service and the hub its notifier publishes to.
    #[must_use]
    pub fn new(service: StatusService, auth: AuthConfig) -> Self {
        let hub = service.notifier().hub().clone();
        Self {
            service: Arc::new(service),
            hub,
            auth: Arc::new(auth),
        }
    }
}
