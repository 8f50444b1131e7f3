//! tab-server binary

use std::time::Duration;

use tab_server::{AppState, Config, api, logger};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env()?;

    logger::init_logger(logger::DEFAULT_FILTER, config.log_json)?;

    tracing::info!("Starting tab-server (env: {})", config.environment);

    let state = AppState::from_config(&config).await?;
    let app = api::create_router(state, Duration::from_secs(config.request_timeout_secs));

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("tab-server HTTP listening on {http_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("tab-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}
