//! Device delivery bookkeeping.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::Result;
use crate::database::{DeviceKey, DeviceRecord, DeviceRepository};

pub struct DeviceTracker {
    devices: Arc<dyn DeviceRepository>,
}

impl DeviceTracker {
    pub fn new(devices: Arc<dyn DeviceRepository>) -> Self {
        Self { devices }
    }

    /// Record the outcome of one attempt against the device's counters.
    ///
    /// Read-modify-write in a single store transaction, so concurrent
    /// deliveries to the same device never lose an increment.
    pub async fn record_delivery(&self, key: &DeviceKey, success: bool) -> Result<DeviceRecord> {
        let now = Utc::now();
        let update = move |record: &mut DeviceRecord| record.apply_delivery(success, now);
        self.devices.update_in_transaction(key, &update).await
    }

    /// Remove a device the gateway reported as gone.
    ///
    /// Returns `false` if the record was already absent.
    pub async fn deactivate(&self, key: &DeviceKey) -> Result<bool> {
        let deleted = self.devices.delete(key).await?;
        if !deleted {
            debug!(device = %key, "Device already removed");
        }
        Ok(deleted)
    }
}
