//! Axum WebSocket upgrade handlers, one per namespace.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;

use super::connection::run_session;
use super::handshake::Handshake;
use crate::app_state::AppState;
use crate::domain::Namespace;

/// `GET /user` — Upgrade to a user session.
pub async fn user_ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<Handshake>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let handshake = Handshake::merge(&headers, query);
    ws.on_upgrade(move |socket| run_session(socket, Namespace::User, handshake, state))
}

/// `GET /agent` — Upgrade to an agent session.
pub async fn agent_ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<Handshake>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let handshake = Handshake::merge(&headers, query);
    ws.on_upgrade(move |socket| run_session(socket, Namespace::Agent, handshake, state))
}
