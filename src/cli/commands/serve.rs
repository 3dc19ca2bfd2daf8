use anyhow::Context;
use tracing::{info, warn};

use crate::app::app;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::services::AuthService;
use crate::state::AppState;

pub async fn handle(mut config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    info!("Starting church registry in {:?} mode", config.environment);

    let store = DatabaseManager::connect(&config.database).await?;
    let state = AppState::new(config, store.clone())?;
    bootstrap_admin(&state).await;

    let bind_addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Listening on http://{}{}", bind_addr, state.config.server.api_prefix);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped, closing store");
    store.close().await;
    Ok(())
}

/// Creates the configured bootstrap admin if the username is free.
async fn bootstrap_admin(state: &AppState) {
    let bootstrap = &state.config.bootstrap;
    let (Some(username), Some(password)) = (&bootstrap.admin_username, &bootstrap.admin_password) else {
        return;
    };
    match AuthService::new(state).ensure_admin(username, password).await {
        Ok(true) => info!("Created bootstrap admin {}", username),
        Ok(false) => info!("Bootstrap admin {} already exists", username),
        Err(e) => warn!("Could not create bootstrap admin {}: {}", username, e),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
