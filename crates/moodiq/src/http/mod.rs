//! HTTP API host for the mood engine.
//!
//! Exposes the engine's three operations plus the event-recording
//! collaborator endpoint as REST routes.

mod routes;
mod types;

pub use routes::create_router;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use moodiq_engine::MoodEngine;
use moodiq_store::SqliteMoodStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Maximum request body size (64 KB). Questions and events are small.
const MAX_BODY_SIZE: usize = 64 * 1024;

/// Shared state behind every route handler.
pub struct AppState {
    pub engine: MoodEngine,
    pub store: Arc<SqliteMoodStore>,
}

/// Start the HTTP API server
pub async fn serve_http(
    engine: MoodEngine,
    store: Arc<SqliteMoodStore>,
    port: u16,
    cors_origin: Option<String>,
) -> Result<()> {
    let state = Arc::new(AppState { engine, store });

    // Build CORS layer
    let cors = if let Some(origin) = cors_origin {
        CorsLayer::new()
            .allow_origin(origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        warn!("No CORS origin specified, allowing all origins. Set --cors-origin in production.");
        CorsLayer::very_permissive()
    };

    let app: Router = create_router(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP API server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
