//! APNs gateway protocol.
//!
//! This crate knows how to talk to the Apple Push Notification service over a
//! certificate-authenticated HTTP/2 connection. It has no notion of devices,
//! retries or bookkeeping; those live in `push-relay`.
//!
//! ## Core Types
//!
//! - [`Environment`] - Production or development gateway selection
//! - [`GatewayRequest`] - A single `POST /3/device/{token}` request
//! - [`DeliveryOutcome`] - Status and body of a gateway response
//! - [`Verdict`] - Classification of an outcome (success / permanent / retryable / terminal)
//!
//! ## Transports
//!
//! - [`PushTransport`] - Sends one request and returns the outcome
//! - [`TransportFactory`] - Builds a transport for an application identifier
//! - [`CertificateTransportFactory`] - Loads `{app}.pem` / `{app}.key` and builds a rustls client

pub mod environment;
pub mod error;
pub mod outcome;
pub mod request;
pub mod transport;

pub use environment::Environment;
pub use error::{Error, Result, TransportError};
pub use outcome::{DeliveryOutcome, Verdict, classify};
pub use request::{EXPIRATION_WINDOW, GatewayRequest};
pub use transport::{
    CertificateTransportFactory, PushTransport, ReqwestTransport, TransportFactory,
    TransportHandle,
};
