use anyhow::Context;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::info;

use coop_portal::{
    app::create_router,
    app_state::AppState,
    config, db, i18n, mail, storage,
    telemetry::{init_telemetry, TelemetryConfig},
};

const LOCALES_DIR: &str = "locales";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = config::init()?.clone();
    let telemetry = init_telemetry(TelemetryConfig::for_environment(
        config.app.environment.as_str(),
    ))
    .await?;

    let pool = db::init_pool(&config.database).await?;
    let localizer = i18n::init_i18n(LOCALES_DIR)
        .await
        .context("Failed to load locales")?;
    let storage = storage::build_storage(&config).await?;
    let mailer = mail::build_mailer(&config)?;

    let addr = config.server_addr();
    let app_name = config.app.name.clone();
    let state = AppState::new(pool, config, Arc::new(localizer), storage, mailer);
    let app = create_router(state);

    info!("{} Listening on {}", app_name, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to serve application")?;

    telemetry.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
