//! # Social Gateway
//!
//! Real-time chat and presence gateway for a social networking application.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Database connection pool
//! - WebSocket gateway server

use anyhow::Result;
use tracing::info;

use social_gateway::config::Settings;
use social_gateway::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    social_gateway::telemetry::init_tracing();

    info!("Starting Social Gateway...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Gateway ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
