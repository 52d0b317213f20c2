//! API server setup and configuration.

use axum::Router;
use axum::extract::Request;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::api::routes;
use crate::config::env_or;
use crate::error::{Error, Result};
use crate::relay::Dispatcher;

/// Path excluded from request tracing.
const PING_PATH: &str = "/ping";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server bind address
    pub bind_address: String,
    /// Server port
    pub port: u16,
    /// Request body size limit in bytes
    pub body_limit: usize,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            body_limit: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl ApiServerConfig {
    /// Load API server config from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `BIND_ADDRESS` (e.g. "0.0.0.0")
    /// - `PORT` (e.g. "8080")
    /// - `PUSH_BODY_LIMIT` (bytes)
    pub fn from_env_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(bind_address) = std::env::var("BIND_ADDRESS")
            && !bind_address.trim().is_empty()
        {
            config.bind_address = bind_address.trim().to_string();
        }

        config.port = env_or("PORT", config.port);
        config.body_limit = env_or("PUSH_BODY_LIMIT", config.body_limit);

        config
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| Error::config(format!("Invalid address: {}", e)))
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Hands decoded notifications to the delivery engine
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Get the cancellation token for graceful shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Build the router with all middleware and routes.
    pub fn build_router(&self) -> Router {
        routes::create_router(self.state.clone())
            .layer(RequestBodyLimitLayer::new(self.config.body_limit))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|req: &Request| {
                        if req.uri().path() == PING_PATH {
                            Span::none()
                        } else {
                            let mut make_span = tower_http::trace::DefaultMakeSpan::new()
                                .level(tracing::Level::INFO);
                            use tower_http::trace::MakeSpan;
                            make_span.make_span(req)
                        }
                    })
                    .on_request(|req: &Request, span: &Span| {
                        if span.is_disabled() {
                            return;
                        }
                        let mut on_request =
                            tower_http::trace::DefaultOnRequest::new().level(tracing::Level::INFO);
                        use tower_http::trace::OnRequest;
                        on_request.on_request(req, span);
                    })
                    .on_response(
                        |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                            if span.is_disabled() {
                                return;
                            }
                            let on_response = tower_http::trace::DefaultOnResponse::new()
                                .level(tracing::Level::INFO);
                            use tower_http::trace::OnResponse;
                            on_response.on_response(res, latency, span);
                        },
                    )
                    .on_failure(
                        |class: tower_http::classify::ServerErrorsFailureClass,
                         latency: Duration,
                         span: &Span| {
                            if span.is_disabled() {
                                return;
                            }
                            let mut on_failure = tower_http::trace::DefaultOnFailure::new()
                                .level(tracing::Level::ERROR);
                            use tower_http::trace::OnFailure;
                            on_failure.on_failure(class, latency, span);
                        },
                    ),
            )
    }

    /// Start the server and serve until the cancel token fires.
    pub async fn run(&self) -> Result<()> {
        let addr = self.config.socket_addr()?;
        let router = self.build_router();

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("API server listening on http://{}", addr);

        let cancel_token = self.cancel_token.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("API server shutting down...");
            })
            .await?;

        Ok(())
    }
}
