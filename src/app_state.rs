//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::SessionConfig;
use crate::service::RelayService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Relay core shared by every connection.
    pub relay: Arc<RelayService>,
    /// Transport limits for every WebSocket session.
    pub session: SessionConfig,
}
