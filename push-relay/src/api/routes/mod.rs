//! API route modules.

pub mod health;
pub mod push;

use axum::Router;

use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(push::router())
        .with_state(state)
}
