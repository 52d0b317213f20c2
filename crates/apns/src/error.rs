//! Gateway error types.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building transports or requests.
#[derive(Error, Debug)]
pub enum Error {
    /// Certificate or key for an application could not be read.
    #[error("Failed to load credentials for {app} from {}: {source}", .path.display())]
    Credentials {
        app: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The PEM material was read but rejected by the TLS stack.
    #[error("Invalid identity for {app}: {source}")]
    Identity {
        app: String,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// A header value could not be encoded.
    #[error("Invalid header {name}: {value}")]
    InvalidHeader { name: &'static str, value: String },
}

/// Transport-level failure: no HTTP status was obtained.
///
/// The dispatcher treats all of these as retryable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let msg = err.to_string();
        if err.is_timeout() {
            Self::Timeout(msg)
        } else if err.is_connect() {
            Self::Connect(msg)
        } else if err.is_body() || err.is_decode() {
            Self::Body(msg)
        } else {
            Self::Request(msg)
        }
    }
}
