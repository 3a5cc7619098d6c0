// ABOUTME: HTTP API layer for CAP records providing REST endpoints and routing
// ABOUTME: Integration layer between axum and the CAP storage package

use axum::{routing::get, Router};

pub mod auth;
pub mod caps_handlers;
pub mod db;
pub mod health;
pub mod response;

pub use db::DbState;

/// Creates the CAP API router (nested under /api/items)
pub fn create_caps_router() -> Router<DbState> {
    Router::new()
        .route(
            "/",
            get(caps_handlers::list_caps).post(caps_handlers::create_cap),
        )
        .route(
            "/{id}",
            get(caps_handlers::get_cap)
                .put(caps_handlers::update_cap)
                .delete(caps_handlers::delete_cap),
        )
}

/// Creates the full application router
pub fn create_router(state: DbState) -> Router {
    Router::new()
        .route("/api/health", get(health::health_check))
        .nest("/api/items", create_caps_router())
        .with_state(state)
}
