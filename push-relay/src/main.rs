use std::sync::Arc;

use apns_gateway::CertificateTransportFactory;
use push_relay::api::{ApiServer, ApiServerConfig, AppState};
use push_relay::config::RelayConfig;
use push_relay::database::{self, SqlxDeviceRepository};
use push_relay::logging::{self, LogFormat};
use push_relay::relay::{ConnectionMonitor, Dispatcher, RelayContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    logging::init_logging(LogFormat::from_env())?;

    let config = RelayConfig::from_env_or_default();
    let api_config = ApiServerConfig::from_env_or_default();

    // Initialize database
    let pool = database::init_pool(&config.database_url).await?;
    database::run_migrations(&pool).await?;

    let factory = CertificateTransportFactory::new(&config.secrets_dir)
        .with_request_timeout(config.request_timeout);
    let ctx = Arc::new(RelayContext::new(
        Arc::new(factory),
        Arc::new(SqlxDeviceRepository::new(pool.clone())),
        &config,
    ));

    // Every configured app must have working credentials before we accept traffic.
    ctx.create_apps(&config.apps)?;

    let server = ApiServer::new(api_config, AppState::new(Dispatcher::new(ctx.clone())));
    let cancel_token = server.cancel_token();

    let monitor = ConnectionMonitor::new(ctx.clone()).start(cancel_token.child_token());

    tokio::spawn({
        let cancel_token = cancel_token.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            tracing::info!("Shutdown signal received");
            cancel_token.cancel();
        }
    });

    tracing::info!(
        apps = ?ctx.registry.apps(),
        secrets_dir = %config.secrets_dir.display(),
        "push-relay initialized successfully"
    );

    let result = server.run().await;
    cancel_token.cancel();
    let _ = monitor.await;

    // Dispatch tasks are detached; whatever is still retrying is dropped here.
    tracing::info!("push-relay stopped, in-flight deliveries abandoned");
    pool.close().await;

    result?;
    Ok(())
}
