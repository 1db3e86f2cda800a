//! HTTP server
//!
//! axum router exposing the relay endpoints:
//!
//! - `GET  /`                - liveness message
//! - `GET  /api/health`      - health check
//! - `GET  /api/models`      - supported display names
//! - `POST /api/completion`  - conversation title
//! - `POST /api/chat`        - unified chunk stream
//!
//! Requests are traced with `tower-http` and CORS is restricted to the
//! configured origins.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::RelayConfig;
use crate::dispatch::Dispatcher;

pub mod handlers;
pub mod response;

pub use response::{PROTOCOL_CONTENT_TYPE, to_protocol_response};

/// Shared, read-only request state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// Build the router with tracing and CORS layers applied.
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/health", get(handlers::health))
        .route("/api/models", get(handlers::list_models))
        .route("/api/completion", post(handlers::completion))
        .route("/api/chat", post(handlers::chat))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// CORS for the configured origins with credentials allowed.
///
/// A `*` entry mirrors the request origin, since a wildcard origin cannot be
/// combined with credentials.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Bind the configured port and serve until Ctrl-C.
pub async fn serve(config: RelayConfig) -> std::io::Result<()> {
    let http_client = reqwest::Client::builder()
        .build()
        .map_err(std::io::Error::other)?;
    let dispatcher = Dispatcher::from_config(&config, http_client);
    let app = create_router(AppState::new(dispatcher), &config.allowed_origins);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
