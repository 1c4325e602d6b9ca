//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::gateway::{handler, GatewayHub};
use crate::infrastructure::{create_pool, JwtAuthVerifier, PgChatDirectory, PgMessageStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<GatewayHub>,
    pub settings: Arc<Settings>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        let db = create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        let hub = Arc::new(GatewayHub::new(
            Arc::new(JwtAuthVerifier::new(&settings.auth.secret)),
            Arc::new(PgChatDirectory::new(db.clone())),
            Arc::new(PgMessageStore::new(db)),
        ));

        let state = AppState {
            hub,
            settings: Arc::new(settings.clone()),
        };

        let router = create_router(state)
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&settings.cors.allowed_origins));

        let addr: SocketAddr = settings.server_addr().parse()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// Build the bare route table. Middleware layers are applied by
/// [`Application::build`]; tests serve this directly.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(handler::ws_handler))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new().allow_origin(AllowOrigin::list(origins))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "connections": state.hub.connection_count(),
    }))
}
