//! Relay introspection: agent roster and connection counts.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::domain::Roster;
use crate::service::RelayStats;

/// `GET /agents` — Current agent roster.
#[utoipa::path(
    get,
    path = "/api/v1/agents",
    tag = "Relay",
    summary = "List connected agents",
    description = "Returns the same agent → connection-time mapping users receive in `list_agents`.",
    responses(
        (status = 200, description = "Agent roster", body = Roster),
    )
)]
pub async fn list_agents(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.relay.roster().await)
}

/// `GET /stats` — Registered users and agents.
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    tag = "Relay",
    summary = "Connection counts",
    responses(
        (status = 200, description = "Connection counts", body = RelayStats),
    )
)]
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.relay.stats().await)
}

/// Relay routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/agents", get(list_agents))
        .route("/stats", get(stats))
}
