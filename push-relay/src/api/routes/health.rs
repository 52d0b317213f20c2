//! Liveness route.

use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};

use crate::api::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/ping", get(ping))
}

/// Liveness check - is the process up and serving?
async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
