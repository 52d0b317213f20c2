//! Delivery dispatcher.
//!
//! Drives one notification from its first attempt to a terminal state:
//!
//! ```text
//! Attempting(n) --200--------------------> record success      -> Succeeded
//! Attempting(n) --400/410----------------> delete device       -> DroppedPermanent
//! Attempting(n) --other status-----------> record failure      -> DroppedTerminal
//! Attempting(n) --429/500/503/io error---> record failure, then
//!                 n <  max: sleep initial_backoff << (n-1)     -> Attempting(n+1)
//!                 n >= max:                                    -> DroppedExhausted
//! ```
//!
//! Bookkeeping failures are logged and never change the transition taken.

use std::sync::Arc;

use apns_gateway::{Verdict, classify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::attempt::{AttemptError, attempt};
use super::context::RelayContext;
use super::notification::Notification;
use crate::database::DeviceKey;

/// Terminal state of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Succeeded,
    DroppedPermanent,
    DroppedTerminal,
    DroppedExhausted,
    DroppedUnknownApp,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::DroppedPermanent => "dropped_permanent",
            Self::DroppedTerminal => "dropped_terminal",
            Self::DroppedExhausted => "dropped_exhausted",
            Self::DroppedUnknownApp => "dropped_unknown_app",
        }
    }
}

impl std::fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    ctx: Arc<RelayContext>,
}

impl Dispatcher {
    pub fn new(ctx: Arc<RelayContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<RelayContext> {
        &self.ctx
    }

    /// Deliver `notification` on a detached task.
    ///
    /// The task is never joined or cancelled; dispatches still in flight at
    /// shutdown are abandoned.
    pub fn spawn(&self, notification: Notification) -> JoinHandle<DispatchOutcome> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.dispatch(notification).await })
    }

    /// Deliver `notification`, retrying transient failures.
    pub async fn dispatch(&self, notification: Notification) -> DispatchOutcome {
        if notification.app.is_empty() || !self.ctx.registry.contains(&notification.app) {
            return self.drop_notification(
                &notification,
                DispatchOutcome::DroppedUnknownApp,
                &format!("Unrecognized app {:?}", notification.app),
            );
        }

        let key = notification.device_key();
        let mut n: u32 = 1;

        loop {
            let result = attempt(&self.ctx, &notification).await;

            let reason = match result {
                Ok(outcome) => match classify(&outcome) {
                    Verdict::Success => {
                        debug!(
                            account_id = notification.account_id,
                            app = %notification.app,
                            attempt = n,
                            "Delivered notification"
                        );
                        self.record(&key, true).await;
                        return DispatchOutcome::Succeeded;
                    }
                    Verdict::Permanent => {
                        info!(
                            account_id = notification.account_id,
                            status = outcome.status,
                            reason = outcome.reason().as_deref().unwrap_or(""),
                            "Gateway rejected device token, removing device"
                        );
                        if let Err(e) = self.ctx.tracker.deactivate(&key).await {
                            warn!(device = %key, error = %e, "Failed to remove device");
                        }
                        return self.drop_notification(
                            &notification,
                            DispatchOutcome::DroppedPermanent,
                            &outcome.to_string(),
                        );
                    }
                    Verdict::Terminal => {
                        self.record(&key, false).await;
                        return self.drop_notification(
                            &notification,
                            DispatchOutcome::DroppedTerminal,
                            &outcome.to_string(),
                        );
                    }
                    Verdict::Retryable => outcome.to_string(),
                },
                Err(AttemptError::UnknownApp(app)) => {
                    return self.drop_notification(
                        &notification,
                        DispatchOutcome::DroppedUnknownApp,
                        &format!("Unrecognized app {app:?}"),
                    );
                }
                Err(AttemptError::Transport(e)) => e.to_string(),
            };

            self.record(&key, false).await;

            if !self.ctx.retry.should_retry(n) {
                return self.drop_notification(
                    &notification,
                    DispatchOutcome::DroppedExhausted,
                    &format!("giving up after {n} attempts: {reason}"),
                );
            }

            let delay = self.ctx.retry.delay_for_attempt(n);
            debug!(
                account_id = notification.account_id,
                attempt = n,
                delay_ms = delay.as_millis() as u64,
                error = %reason,
                "Delivery failed, retrying"
            );
            tokio::time::sleep(delay).await;
            n += 1;
        }
    }

    async fn record(&self, key: &DeviceKey, success: bool) {
        if let Err(e) = self.ctx.tracker.record_delivery(key, success).await {
            warn!(device = %key, success, error = %e, "Failed to update device");
        }
    }

    fn drop_notification(
        &self,
        notification: &Notification,
        outcome: DispatchOutcome,
        reason: &str,
    ) -> DispatchOutcome {
        warn!(
            account_id = notification.account_id,
            app = %notification.app,
            outcome = %outcome,
            error = %reason,
            payload = %notification.payload_str(),
            "Dropped notification"
        );
        outcome
    }
}
