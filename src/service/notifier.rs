//! Mutation-to-broadcast adapter.
//!
//! [`Notifier::notify`] only accepts a [`Committed`] change, so the type
//! system enforces "persist, then notify". Broadcasting is best-effort: the
//! change already happened, so a hub failure is logged and swallowed.

use crate::domain::{ChangeEvent, Envelope};
use crate::persistence::Committed;
use crate::ws::Hub;

/// Turns committed changes into hub broadcasts.
#[derive(Debug, Clone)]
pub struct Notifier {
    hub: Hub,
}

impl Notifier {
    /// Creates a notifier publishing through `hub`.
    #[must_use]
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }

    /// Returns the underlying hub.
    #[must_use]
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Wraps the committed change in an [`Envelope`] and broadcasts it.
    pub async fn notify(&self, change: Committed<ChangeEvent>) {
        let event = change.into_inner();
        let kind = event.kind();
        let organization_id = event.organization_id();

        match self.hub.broadcast(Envelope::new(event)).await {
            Ok(()) => tracing::debug!(%kind, %organization_id, "change broadcast queued"),
            Err(e) => {
                tracing::warn!(%kind, %organization_id, error = %e, "change committed but broadcast failed");
            }
        }
    }
}
