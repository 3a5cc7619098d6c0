// ABOUTME: CAP records HTTP server wiring
// ABOUTME: Builds the layered axum app from configuration and serves it

use std::net::SocketAddr;

use axum::{
    http::{HeaderValue, Method},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use cap_api::DbState;
use cap_storage::PoolSettings;

pub mod config;
pub mod middleware;

use config::Config;

/// Router with CORS, request tracing and panic recovery applied
pub fn build_app(state: DbState, config: &Config) -> anyhow::Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Ok(cap_api::create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::create_panic_handler()))
}

pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let state = DbState::init_with_path(&config.database_path, &PoolSettings::default())
        .await?
        .with_dev_user(config.dev_user.clone());

    if let Some(user) = &config.dev_user {
        info!("Requests without X-User-Id will act as dev user: {}", user);
    }
    info!("CORS origin: {}", config.cors_origin);

    let app = build_app(state, &config)?;

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
