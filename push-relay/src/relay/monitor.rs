//! Connection health monitor.
//!
//! Gateway connections can go stale without any error surfacing. When no
//! delivery has succeeded for longer than the idle threshold, every transport
//! in the registry is rebuilt.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::context::RelayContext;

/// Instant of the most recent successful delivery, across all apps.
#[derive(Debug)]
pub struct LastDelivery(Mutex<Instant>);

impl LastDelivery {
    pub fn new() -> Self {
        Self(Mutex::new(Instant::now()))
    }

    pub fn touch(&self) {
        *self.0.lock() = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.0.lock().elapsed()
    }

    pub fn reset(&self) {
        self.touch();
    }
}

impl Default for LastDelivery {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ConnectionMonitor {
    ctx: Arc<RelayContext>,
}

impl ConnectionMonitor {
    pub fn new(ctx: Arc<RelayContext>) -> Self {
        Self { ctx }
    }

    /// Run one idle check. Returns `true` if the transports were refreshed.
    ///
    /// Transports are rebuilt on the blocking pool since construction reads
    /// credentials from disk.
    pub async fn check_once(&self) -> bool {
        let idle = self.ctx.last_delivery.elapsed();
        if idle <= self.ctx.monitor.ping_threshold {
            return false;
        }

        // Reset first so a slow refresh is not immediately retriggered.
        self.ctx.last_delivery.reset();
        let ctx = self.ctx.clone();
        let refreshed = match tokio::task::spawn_blocking(move || ctx.registry.refresh_all()).await
        {
            Ok(refreshed) => refreshed,
            Err(e) => {
                warn!(error = %e, "Gateway transport refresh task failed");
                0
            }
        };
        info!(
            idle_secs = idle.as_secs(),
            refreshed,
            total = self.ctx.registry.len(),
            "No successful delivery within threshold, refreshed gateway transports"
        );
        true
    }

    /// Tick until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.ctx.monitor.ping_frequency);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(
            frequency = ?self.ctx.monitor.ping_frequency,
            threshold = ?self.ctx.monitor.ping_threshold,
            "Connection monitor started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Connection monitor stopped");
                    break;
                }
                _ = ticker.tick() => {
                    self.check_once().await;
                }
            }
        }
    }

    pub fn start(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
