mod auth;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use common::{Error, Result};
use engine::ScannerHandle;
use strategy::DetectorRegistry;

pub use auth::{sign, verify_signature, SIGNATURE_HEADER};

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub scanner: ScannerHandle,
    pub registry: Arc<DetectorRegistry>,
    /// Number of configured watch entries.
    pub watch_count: usize,
    pub api_token: String,
    pub webhook_secret: String,
}

/// Full router with all routes and CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .merge(routes::api_router(state.clone()))
        .merge(routes::webhook_router())
        .merge(routes::health_router())
        .with_state(state)
        .layer(cors)
}

/// Build and run the Axum API server.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(state);

    info!(%addr, "HTTP API listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Http(e.to_string()))
}
