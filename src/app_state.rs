//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Instant;

use crate::broadcast::SessionBroadcaster;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Session broadcaster owning every live connection.
    pub broadcaster: Arc<SessionBroadcaster>,
    /// Fully-qualified name the service is advertised under.
    pub advertised_as: Arc<str>,
    /// When the server started serving.
    pub started_at: Instant,
}
