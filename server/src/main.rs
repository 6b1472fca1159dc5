//! Baler Server - sync and session backend for buyback terminals.
//!
//! This server provides the HTTP endpoints browser terminals use to push
//! and pull their local data, authenticate staff, and manage support chat
//! sessions. Documents are merged with the baler-engine newest-wins logic.

mod auth;
mod config;
mod controller;
mod error;
mod routes;

use crate::config::Config;
use crate::controller::Controller;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Controller>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "baler_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Baler Server on {}:{}", config.host, config.port);

    // Open the document store
    let controller = Controller::open(&config.data_dir)?;

    // Build application state
    let state = AppState {
        controller: Arc::new(controller),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
