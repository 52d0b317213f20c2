//! Gateway request construction.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use crate::environment::Environment;
use crate::error::{Error, Result};

/// How long the gateway should keep trying to deliver a stored notification.
pub const EXPIRATION_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub const APNS_EXPIRATION: HeaderName = HeaderName::from_static("apns-expiration");
pub const APNS_TOPIC: HeaderName = HeaderName::from_static("apns-topic");

/// One `POST {host}/3/device/{token}` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRequest {
    pub url: String,
    /// `apns-topic`, the application identifier.
    pub topic: String,
    /// `apns-expiration`, Unix seconds.
    pub expiration: i64,
    pub payload: Bytes,
}

impl GatewayRequest {
    pub fn new(
        environment: Environment,
        device_token: &str,
        app: &str,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self::at(environment, device_token, app, payload, Utc::now())
    }

    /// Build a request as if sent at `now`.
    pub fn at(
        environment: Environment,
        device_token: &str,
        app: &str,
        payload: impl Into<Bytes>,
        now: DateTime<Utc>,
    ) -> Self {
        let window = chrono::Duration::from_std(EXPIRATION_WINDOW)
            .unwrap_or_else(|_| chrono::Duration::days(7));
        Self {
            url: device_url(environment, device_token),
            topic: app.to_string(),
            expiration: (now + window).timestamp(),
            payload: payload.into(),
        }
    }

    /// Protocol headers for this request.
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(3);
        headers.insert(APNS_EXPIRATION, HeaderValue::from(self.expiration));
        headers.insert(
            APNS_TOPIC,
            HeaderValue::from_str(&self.topic).map_err(|_| Error::InvalidHeader {
                name: "apns-topic",
                value: self.topic.clone(),
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

/// `{host}/3/device/{token}` for the given environment.
pub fn device_url(environment: Environment, device_token: &str) -> String {
    format!("{}/3/device/{}", environment.host(), device_token)
}
