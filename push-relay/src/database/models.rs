//! Device database model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Identifies a device row: owning account plus device token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceKey {
    pub account_id: i64,
    pub token: String,
}

impl DeviceKey {
    pub fn new(account_id: i64, token: impl Into<String>) -> Self {
        Self {
            account_id,
            token: token.into(),
        }
    }
}

impl std::fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.account_id, self.token)
    }
}

/// Durable delivery health of one device token.
///
/// `failures` counts consecutive failures and resets on success; the `total_*`
/// counters only ever grow.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub account_id: i64,
    pub token: String,
    pub api_version: i64,
    pub app: String,
    pub created_at: DateTime<Utc>,
    pub device_id: String,
    pub device_info: String,
    pub environment: String,
    pub failures: i64,
    pub last_success: Option<DateTime<Utc>>,
    pub platform: String,
    pub total_failures: i64,
    pub total_successes: i64,
    pub updated_at: DateTime<Utc>,
}

impl DeviceRecord {
    pub fn new(key: DeviceKey, app: impl Into<String>, environment: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            account_id: key.account_id,
            token: key.token,
            api_version: 0,
            app: app.into(),
            created_at: now,
            device_id: String::new(),
            device_info: String::new(),
            environment: environment.into(),
            failures: 0,
            last_success: None,
            platform: "ios".to_string(),
            total_failures: 0,
            total_successes: 0,
            updated_at: now,
        }
    }

    pub fn key(&self) -> DeviceKey {
        DeviceKey::new(self.account_id, self.token.clone())
    }

    /// Apply the outcome of one delivery attempt at `now`.
    pub fn apply_delivery(&mut self, success: bool, now: DateTime<Utc>) {
        self.updated_at = now;
        if success {
            self.last_success = Some(now);
            self.total_successes = self.total_successes.saturating_add(1);
            self.failures = 0;
        } else {
            self.failures = self.failures.saturating_add(1);
            self.total_failures = self.total_failures.saturating_add(1);
        }
    }
}
