//! agent-relay server entry point.
//!
//! Starts the Axum HTTP server with the user/agent WebSocket namespaces
//! and the REST endpoints.

use std::sync::Arc;

use anyhow::Context;

use agent_relay::app_state::AppState;
use agent_relay::auth::HttpTokenValidator;
use agent_relay::config::RelayConfig;
use agent_relay::server::{build_app, init_tracing, shutdown_signal};
use agent_relay::service::RelayService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = RelayConfig::from_env().context("loading configuration")?;
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting agent-relay");
    if config.auth_api_base.is_empty() {
        tracing::warn!("API is not set; every user connection will be rejected");
    }

    // Build relay core
    let validator = HttpTokenValidator::new(&config.auth_api_base, config.auth_timeout)
        .context("building auth client")?;
    let relay = Arc::new(RelayService::new(Arc::new(validator), config.admission));

    let app_state = AppState {
        relay,
        session: config.session,
    };
    let app = build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    tracing::info!("server stopped");
    Ok(())
}
