//! Relay configuration loaded from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Application bundle id registered at startup when `PUSH_APPS` is unset.
pub const DEFAULT_APP: &str = "cam.reaction.ReactionCam";

const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);
const MIN_PING_FREQUENCY: Duration = Duration::from_secs(1);

/// Retry policy for one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each further one.
    pub initial_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// Delay to wait after failed attempt `attempt` (1-based).
    ///
    /// `initial_backoff * 2^(attempt - 1)`: 1s, 2s, 4s, ... with the defaults.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .checked_mul(1u32 << shift)
            .unwrap_or(Duration::MAX)
    }

    /// Whether another attempt may follow attempt `attempt`.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Connection health monitor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// How often the idle check runs.
    pub ping_frequency: Duration,
    /// Idle time after which every transport is rebuilt.
    pub ping_threshold: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ping_frequency: Duration::from_secs(1),
            ping_threshold: Duration::from_secs(60),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Application identifiers whose transports are created at startup.
    pub apps: Vec<String>,
    /// Directory holding `{app}.pem` and `{app}.key`.
    pub secrets_dir: PathBuf,
    /// Device store URL.
    pub database_url: String,
    /// Per-request gateway timeout.
    pub request_timeout: Duration,
    pub retry: RetryConfig,
    pub monitor: MonitorConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            apps: vec![DEFAULT_APP.to_string()],
            secrets_dir: PathBuf::from("secrets"),
            database_url: "sqlite:push-relay.db?mode=rwc".to_string(),
            request_timeout: Duration::from_secs(3),
            retry: RetryConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `PUSH_APPS` (comma-separated bundle ids)
    /// - `SECRETS_DIR`
    /// - `DATABASE_URL`
    /// - `PUSH_REQUEST_TIMEOUT_SECS`
    /// - `PUSH_MAX_ATTEMPTS`
    /// - `PUSH_INITIAL_BACKOFF_MS`
    /// - `PUSH_PING_FREQUENCY_SECS`
    /// - `PUSH_PING_THRESHOLD_SECS`
    pub fn from_env_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(apps) = std::env::var("PUSH_APPS") {
            let apps = parse_apps(&apps);
            if !apps.is_empty() {
                config.apps = apps;
            }
        }

        if let Ok(dir) = std::env::var("SECRETS_DIR")
            && !dir.trim().is_empty()
        {
            config.secrets_dir = PathBuf::from(dir.trim());
        }

        if let Ok(url) = std::env::var("DATABASE_URL")
            && !url.trim().is_empty()
        {
            config.database_url = url;
        }

        config.request_timeout = Duration::from_secs(env_or(
            "PUSH_REQUEST_TIMEOUT_SECS",
            config.request_timeout.as_secs(),
        ));
        config.retry.max_attempts = env_or("PUSH_MAX_ATTEMPTS", config.retry.max_attempts);
        config.retry.initial_backoff = Duration::from_millis(env_or(
            "PUSH_INITIAL_BACKOFF_MS",
            config.retry.initial_backoff.as_millis() as u64,
        ));
        config.monitor.ping_frequency = Duration::from_secs(env_or(
            "PUSH_PING_FREQUENCY_SECS",
            config.monitor.ping_frequency.as_secs(),
        ));
        config.monitor.ping_threshold = Duration::from_secs(env_or(
            "PUSH_PING_THRESHOLD_SECS",
            config.monitor.ping_threshold.as_secs(),
        ));

        config.normalized()
    }

    /// Raise zero values to their smallest usable setting.
    ///
    /// A zero request timeout would fail every send before it is written.
    pub fn normalized(mut self) -> Self {
        self.request_timeout = self.request_timeout.max(MIN_REQUEST_TIMEOUT);
        self.retry.max_attempts = self.retry.max_attempts.max(1);
        self.monitor.ping_frequency = self.monitor.ping_frequency.max(MIN_PING_FREQUENCY);
        self
    }
}

/// Split a comma-separated app list, dropping blanks and duplicates.
pub fn parse_apps(value: &str) -> Vec<String> {
    let mut apps: Vec<String> = Vec::new();
    for app in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !apps.iter().any(|existing| existing == app) {
            apps.push(app.to_string());
        }
    }
    apps
}

/// Read and parse `name`, keeping `default` when unset or invalid.
pub(crate) fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(var = name, value = %raw, default = %default, "Invalid value, using default");
                default
            }
        },
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert!(config.should_retry(1));
        assert!(config.should_retry(2));
        assert!(!config.should_retry(3));
    }

    #[test]
    fn test_retry_delay_doubles() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(4), Duration::from_secs(8));
    }

    #[test]
    fn test_retry_delay_saturates() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(32), Duration::from_secs(1 << 31));
        assert_eq!(config.delay_for_attempt(u32::MAX), Duration::from_secs(1 << 31));

        let huge = RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::MAX,
        };
        assert_eq!(huge.delay_for_attempt(2), Duration::MAX);
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.apps, vec![DEFAULT_APP.to_string()]);
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.monitor.ping_frequency, Duration::from_secs(1));
        assert_eq!(config.monitor.ping_threshold, Duration::from_secs(60));
    }

    #[test]
    fn test_normalized_raises_zero_values() {
        let mut config = RelayConfig::default();
        config.request_timeout = Duration::ZERO;
        config.retry.max_attempts = 0;
        config.monitor.ping_frequency = Duration::ZERO;

        let config = config.normalized();
        assert_eq!(config.request_timeout, Duration::from_secs(1));
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.monitor.ping_frequency, Duration::from_secs(1));
    }

    #[test]
    fn test_normalized_keeps_usable_values() {
        let config = RelayConfig::default().normalized();
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.monitor.ping_frequency, Duration::from_secs(1));
    }

    #[test]
    fn test_parse_apps() {
        assert_eq!(
            parse_apps(" com.a.One, ,com.b.Two,com.a.One "),
            vec!["com.a.One".to_string(), "com.b.Two".to_string()]
        );
        assert!(parse_apps(" , ").is_empty());
    }
}
