//! voxroom server library logic.
//!
//! Hosts the HTTP token endpoint and the startup wiring for the agent worker.

pub mod api;
pub mod config;

use axum::{routing::get, Extension, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use voxroom_agent::{RelayClient, Worker};
use voxroom_voice::{SpeechStack, TokenIssuer, VoiceError};

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Signs room-join tokens with the relay credentials.
    pub token_issuer: Arc<TokenIssuer>,
}

impl AppState {
    pub fn from_config(config: &config::Config) -> Self {
        Self {
            token_issuer: Arc::new(TokenIssuer::new(&config.relay)),
        }
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/getToken", get(api::get_token_handler))
        .layer(Extension(Arc::new(state)))
        .layer(TraceLayer::new_for_http())
}

/// Startup warning for missing relay credentials, if any.
///
/// With the worker enabled, registration fails and the process exits before
/// the HTTP listener binds.
pub fn missing_credentials_warning(config: &config::Config) -> Option<&'static str> {
    if config.relay.has_credentials() {
        None
    } else if config.agent.enabled {
        Some(
            "relay API key/secret not configured; the agent worker cannot register, so the \
             server will not start until LIVEKIT_API_KEY and LIVEKIT_API_SECRET are set or \
             agent.enabled is false",
        )
    } else {
        Some(
            "relay API key/secret not configured; /getToken will answer 500 until \
             LIVEKIT_API_KEY and LIVEKIT_API_SECRET are set",
        )
    }
}

/// Builds the speech stack from `config` and registers a worker with
/// `relay`.
///
/// # Errors
///
/// Fails if the speech adapters cannot be built or the relay refuses the
/// registration. The server does not start without a registered worker.
pub async fn start_worker(
    config: &config::Config,
    relay: &dyn RelayClient,
) -> Result<Arc<Worker>, VoiceError> {
    let speech = SpeechStack::from_config(&config.speech)?;
    let worker = Worker::new(speech);
    worker.start(relay, &config.relay).await?;
    Ok(worker)
}
