//! A single delivery attempt.

use apns_gateway::{DeliveryOutcome, GatewayRequest, TransportError};
use thiserror::Error;
use tracing::trace;

use super::context::RelayContext;
use super::notification::Notification;

#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("Unrecognized app {0:?}")]
    UnknownApp(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Send `notification` once through the app's current transport.
///
/// The transport handle is held only for the duration of this call; a
/// concurrent refresh swaps the registry entry without affecting it.
pub async fn attempt(
    ctx: &RelayContext,
    notification: &Notification,
) -> Result<DeliveryOutcome, AttemptError> {
    let transport = ctx
        .registry
        .get(&notification.app)
        .map_err(|_| AttemptError::UnknownApp(notification.app.clone()))?;

    let request = GatewayRequest::new(
        notification.environment,
        &notification.device_token,
        &notification.app,
        notification.data.clone(),
    );
    trace!(url = %request.url, expiration = request.expiration, "Sending to gateway");

    let outcome = tokio::time::timeout(ctx.request_timeout, transport.send(&request))
        .await
        .map_err(|_| {
            TransportError::Timeout(format!(
                "no response within {}s",
                ctx.request_timeout.as_secs_f32()
            ))
        })??;

    if outcome.is_success() {
        ctx.last_delivery.touch();
    }

    Ok(outcome)
}
