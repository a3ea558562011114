//! HTTP server setup and routing

use crate::error::Result;
use crate::playback::RecitationEngine;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub engine: Arc<RecitationEngine>,
}

/// Build the router with all routes attached to `ctx`
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(super::handlers::health))
        .route("/audio/devices", get(super::handlers::list_audio_devices))

        // Reciter selection
        .route("/reciters", get(super::handlers::list_reciters))
        .route(
            "/reciter",
            get(super::handlers::get_reciter).post(super::handlers::set_reciter),
        )
        .route("/reciter/switch", post(super::handlers::switch_reciter))

        // Playback control
        .route("/playback/surah", post(super::handlers::play_surah))
        .route("/playback/verse", post(super::handlers::play_verse))
        .route("/playback/pause", post(super::handlers::pause))
        .route("/playback/resume", post(super::handlers::resume))
        .route("/playback/stop", post(super::handlers::stop))
        .route("/playback/status", get(super::handlers::get_status))

        // Offline cache
        .route(
            "/cache/surah/:chapter",
            get(super::handlers::get_surah_cache)
                .post(super::handlers::download_surah)
                .delete(super::handlers::remove_surah),
        )

        // SSE event stream
        .route("/events", get(super::sse::event_stream))

        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}

/// Serve the API on `port` until Ctrl-C or SIGTERM
pub async fn run(port: u16, engine: Arc<RecitationEngine>) -> Result<()> {
    let app = create_router(AppContext { engine });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
