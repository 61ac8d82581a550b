//! voxroom server binary.
//!
//! Serves the token endpoint with structured logging and graceful shutdown on
//! SIGTERM/SIGINT, and registers the agent worker with the relay.

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use voxroom_agent::LoopbackRelay;
use voxroom_server::{app, config, missing_credentials_warning, start_worker, AppState};

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("VOXROOM_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    // A missing .env file is normal outside development.
    let dotenv_path = dotenvy::dotenv().ok();

    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        dotenv = dotenv_path.is_some(),
        "resolved startup configuration path"
    );
    tracing::debug!(relay = ?config.relay, "relay configuration");

    if let Some(warning) = missing_credentials_warning(&config) {
        tracing::warn!("{}", warning);
    }

    // Register the agent worker. The in-process loopback relay stands in for
    // the external relay client, which hands rooms to the same handler.
    let relay = LoopbackRelay::new();
    let _worker = if config.agent.enabled {
        let worker = start_worker(&config, &relay)
            .await
            .expect("failed to register agent worker with the relay");
        Some(worker)
    } else {
        tracing::info!("agent worker disabled");
        None
    };

    // Build application
    let app = app(AppState::from_config(&config));
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "token server running");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("voxroom server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
