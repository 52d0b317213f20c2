//! Transports: the authenticated HTTP/2 clients requests are sent through.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result, TransportError};
use crate::outcome::DeliveryOutcome;
use crate::request::GatewayRequest;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Shared handle to a transport. Replaced wholesale, never mutated.
pub type TransportHandle = Arc<dyn PushTransport>;

/// Sends one request to the gateway.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Send `request` and return the response.
    ///
    /// Implementations must read the full response body before returning so
    /// the underlying connection goes back to the pool cleanly.
    async fn send(
        &self,
        request: &GatewayRequest,
    ) -> std::result::Result<DeliveryOutcome, TransportError>;
}

/// Builds a ready-to-use transport for an application identifier.
pub trait TransportFactory: Send + Sync {
    fn construct(&self, app: &str) -> Result<TransportHandle>;
}

/// [`PushTransport`] backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PushTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &GatewayRequest,
    ) -> std::result::Result<DeliveryOutcome, TransportError> {
        let headers = request
            .headers()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let response = self
            .client
            .post(&request.url)
            .headers(headers)
            .body(request.payload.clone())
            .send()
            .await?;

        let status = response.status().as_u16();
        // Drain even on success so the stream is released.
        let body = response.bytes().await?;

        Ok(DeliveryOutcome { status, body })
    }
}

/// Install the process-wide rustls crypto provider once.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate got there first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Loads `{secrets_dir}/{app}.pem` and `{secrets_dir}/{app}.key` and builds a
/// client-certificate authenticated HTTP/2 transport.
#[derive(Debug, Clone)]
pub struct CertificateTransportFactory {
    secrets_dir: PathBuf,
    request_timeout: Duration,
}

impl CertificateTransportFactory {
    pub fn new(secrets_dir: impl Into<PathBuf>) -> Self {
        Self {
            secrets_dir: secrets_dir.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn certificate_path(&self, app: &str) -> PathBuf {
        self.secrets_dir.join(format!("{app}.pem"))
    }

    pub fn key_path(&self, app: &str) -> PathBuf {
        self.secrets_dir.join(format!("{app}.key"))
    }

    fn read_pem(app: &str, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|source| Error::Credentials {
            app: app.to_string(),
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the underlying client for `app`.
    pub fn build_client(&self, app: &str) -> Result<reqwest::Client> {
        install_rustls_provider();

        let mut pem = Self::read_pem(app, &self.certificate_path(app))?;
        if !pem.ends_with(b"\n") {
            pem.push(b'\n');
        }
        pem.extend_from_slice(&Self::read_pem(app, &self.key_path(app))?);

        let identity = reqwest::Identity::from_pem(&pem).map_err(|source| Error::Identity {
            app: app.to_string(),
            source,
        })?;

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .identity(identity)
            .timeout(self.request_timeout)
            .build()?;

        debug!(app = %app, "Built gateway client");
        Ok(client)
    }
}

impl TransportFactory for CertificateTransportFactory {
    fn construct(&self, app: &str) -> Result<TransportHandle> {
        let client = self.build_client(app)?;
        Ok(Arc::new(ReqwestTransport::new(client)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;

    #[test]
    fn test_paths() {
        let factory = CertificateTransportFactory::new("/etc/push/secrets");
        assert_eq!(
            factory.certificate_path("cam.reaction.ReactionCam"),
            PathBuf::from("/etc/push/secrets/cam.reaction.ReactionCam.pem")
        );
        assert_eq!(
            factory.key_path("cam.reaction.ReactionCam"),
            PathBuf::from("/etc/push/secrets/cam.reaction.ReactionCam.key")
        );
    }

    #[test]
    fn test_missing_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let factory = CertificateTransportFactory::new(dir.path());

        match factory.construct("com.example.Missing") {
            Err(Error::Credentials { app, path, .. }) => {
                assert_eq!(app, "com.example.Missing");
                assert!(path.ends_with("com.example.Missing.pem"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("construct should fail without credentials"),
        }
    }

    #[test]
    fn test_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("com.example.App.pem"), "not a cert").unwrap();
        let factory = CertificateTransportFactory::new(dir.path());

        match factory.construct("com.example.App") {
            Err(Error::Credentials { path, .. }) => {
                assert!(path.ends_with("com.example.App.key"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("construct should fail without a key"),
        }
    }

    #[test]
    fn test_garbage_identity() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("com.example.App.pem"), "not a cert").unwrap();
        std::fs::write(dir.path().join("com.example.App.key"), "not a key").unwrap();
        let factory = CertificateTransportFactory::new(dir.path());

        assert!(matches!(
            factory.construct("com.example.App"),
            Err(Error::Identity { .. })
        ));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        install_rustls_provider();
        let transport = ReqwestTransport::new(
            reqwest::Client::builder()
                .timeout(Duration::from_secs(2))
                .build()
                .unwrap(),
        );
        let mut request = GatewayRequest::new(Environment::Production, "token", "app", "{}");
        request.url = "http://127.0.0.1:1/3/device/token".to_string();

        let err = transport.send(&request).await.unwrap_err();
        assert!(
            matches!(
                err,
                TransportError::Connect(_) | TransportError::Timeout(_) | TransportError::Request(_)
            ),
            "unexpected error: {err:?}"
        );
    }
}
