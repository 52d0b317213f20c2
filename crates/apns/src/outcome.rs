//! Gateway responses and their classification.

use bytes::Bytes;
use serde::Deserialize;

/// Status and body of one gateway response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub status: u16,
    pub body: Bytes,
}

impl DeliveryOutcome {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200, Bytes::new())
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// The `reason` field of an APNs error body, e.g. `BadDeviceToken`.
    ///
    /// Only used for logging; classification never looks at it.
    pub fn reason(&self) -> Option<String> {
        #[derive(Deserialize)]
        struct ErrorBody {
            reason: String,
        }

        serde_json::from_slice::<ErrorBody>(&self.body)
            .ok()
            .map(|b| b.reason)
    }
}

impl std::fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "HTTP {} ({})",
            self.status,
            String::from_utf8_lossy(&self.body)
        )
    }
}

/// What the dispatcher should do with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Delivered.
    Success,
    /// The token is dead or the request can never succeed: delete the device.
    Permanent,
    /// Transient gateway condition: count a failure and retry.
    Retryable,
    /// Rejected but the token may still be good: count a failure and drop.
    Terminal,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Permanent => "permanent",
            Self::Retryable => "retryable",
            Self::Terminal => "terminal",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a gateway response by status code.
pub fn classify(outcome: &DeliveryOutcome) -> Verdict {
    match outcome.status {
        200 => Verdict::Success,
        400 | 410 => Verdict::Permanent,
        429 | 500 | 503 => Verdict::Retryable,
        _ => Verdict::Terminal,
    }
}
