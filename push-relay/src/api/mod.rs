//! HTTP surface: notification ingestion and liveness.

pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
