//! REST API layer: route handlers and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`; health and the
//! OpenAPI document live at the root.

pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::domain::Roster;
use crate::error::{ErrorBody, ErrorResponse};
use crate::service::RelayStats;

/// OpenAPI document for the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        handlers::system::health_handler,
        handlers::relay::list_agents,
        handlers::relay::stats,
    ),
    components(schemas(
        Roster,
        RelayStats,
        ErrorResponse,
        ErrorBody,
        handlers::system::HealthResponse,
    )),
    tags(
        (name = "System", description = "Service health"),
        (name = "Relay", description = "Agent roster and connection counts"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}
