//! Shared engine state.

use std::sync::Arc;
use std::time::Duration;

use apns_gateway::TransportFactory;

use super::monitor::LastDelivery;
use super::registry::TransportRegistry;
use super::tracker::DeviceTracker;
use crate::Result;
use crate::config::{MonitorConfig, RelayConfig, RetryConfig};
use crate::database::DeviceRepository;

/// State shared by the ingestion handlers, every dispatch and the monitor.
///
/// Built once at startup and passed around as `Arc<RelayContext>`.
pub struct RelayContext {
    pub registry: TransportRegistry,
    pub last_delivery: LastDelivery,
    pub tracker: DeviceTracker,
    pub retry: RetryConfig,
    pub monitor: MonitorConfig,
    /// Upper bound for a single gateway round trip.
    pub request_timeout: Duration,
}

impl RelayContext {
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        devices: Arc<dyn DeviceRepository>,
        config: &RelayConfig,
    ) -> Self {
        Self {
            registry: TransportRegistry::new(factory),
            last_delivery: LastDelivery::new(),
            tracker: DeviceTracker::new(devices),
            retry: config.retry.clone(),
            monitor: config.monitor.clone(),
            request_timeout: config.request_timeout,
        }
    }

    /// Register a transport for each app. Stops at the first failure.
    pub fn create_apps(&self, apps: &[String]) -> Result<()> {
        for app in apps {
            self.registry.create(app)?;
        }
        Ok(())
    }
}
