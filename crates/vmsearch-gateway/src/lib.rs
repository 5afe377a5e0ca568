//! HTTP face of the search stack.
//!
//! `GET /api/search` answers `{ results, query }`; failures come back as
//! `{ error, message }` with a 5xx status, and unknown routes as a 404 in the
//! same envelope.

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{routing::get, Router};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::info;

use vmsearch_engine::Searcher;

pub use error::{ApiError, GatewayError};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub searcher: Searcher,
    pub expose_error_details: bool,
    started: Instant,
}

impl AppState {
    pub fn new(searcher: Searcher, expose_error_details: bool) -> Self {
        Self { searcher, expose_error_details, started: Instant::now() }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    fn fail(&self, error: impl Into<GatewayError>) -> ApiError {
        ApiError::new(error, self.expose_error_details)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api", get(handlers::describe))
        .route("/api/engine/health", get(handlers::engine_health))
        .route("/api/search", get(handlers::search))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}

/// Serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, collection = state.searcher.collection(), "Gateway listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
}
