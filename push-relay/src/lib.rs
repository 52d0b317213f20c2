//! push-relay: a push notification relay for the Apple Push Notification service.
//!
//! Notifications arrive as newline-delimited JSON over HTTP and are delivered
//! through per-application certificate-authenticated gateway clients. Each
//! device's delivery health is tracked in SQLite; dead tokens are removed.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod relay;

pub use error::{Error, Result};
