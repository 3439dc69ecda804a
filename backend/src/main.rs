mod calendar;
mod config;
mod error;
mod handlers;
mod middleware;
mod normalize;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::calendar::GoogleCalendarClient;
use crate::config::AppConfig;
use crate::routes::create_app;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "appointments_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    tracing::info!(
        "Starting appointments API for calendar {} ({} day window, malformed events: {})",
        config.calendar_id,
        config.lookahead_days,
        config.malformed_events
    );

    let events = Arc::new(GoogleCalendarClient::new(
        config.service_account_file.clone(),
        config.calendar_id.clone(),
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = create_app(AppState::new(config, events));

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {:?}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping...");
}
