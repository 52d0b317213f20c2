//! Push requests as decoded from the ingestion stream.

use std::borrow::Cow;

use apns_gateway::Environment;
use bytes::Bytes;
use serde::{Deserialize, Deserializer};
use serde_json::value::RawValue;

use crate::database::DeviceKey;

/// One notification to deliver to one device.
///
/// Immutable; moved into exactly one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Owning account, used for the device key and for log correlation.
    pub account_id: i64,
    pub app: String,
    pub device_token: String,
    pub environment: Environment,
    /// Payload forwarded to the gateway verbatim.
    pub data: Bytes,
}

#[derive(Deserialize)]
struct NotificationLine {
    #[serde(default)]
    account_id: i64,
    #[serde(default)]
    app: String,
    #[serde(default, deserialize_with = "present")]
    data: Option<Box<RawValue>>,
    #[serde(default)]
    device_token: String,
    #[serde(default)]
    environment: Environment,
}

/// An explicit `null` counts as present so it is forwarded as-is; only an
/// absent field leaves `data` empty.
fn present<'de, D>(deserializer: D) -> Result<Option<Box<RawValue>>, D::Error>
where
    D: Deserializer<'de>,
{
    Box::<RawValue>::deserialize(deserializer).map(Some)
}

impl Notification {
    pub fn new(
        account_id: i64,
        app: impl Into<String>,
        device_token: impl Into<String>,
        environment: Environment,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            account_id,
            app: app.into(),
            device_token: device_token.into(),
            environment,
            data: data.into(),
        }
    }

    /// Decode one JSON line:
    /// `{"account_id", "app", "data", "device_token", "environment"}`.
    ///
    /// Missing fields take their zero value; `data` is kept byte-for-byte.
    pub fn decode(line: &[u8]) -> Result<Self, serde_json::Error> {
        let line: NotificationLine = serde_json::from_slice(line)?;
        Ok(Self {
            account_id: line.account_id,
            app: line.app,
            device_token: line.device_token,
            environment: line.environment,
            data: line
                .data
                .map(|raw| Bytes::copy_from_slice(raw.get().as_bytes()))
                .unwrap_or_default(),
        })
    }

    pub fn device_key(&self) -> DeviceKey {
        DeviceKey::new(self.account_id, self.device_token.clone())
    }

    /// Payload as text, for logging dropped notifications.
    pub fn payload_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}
