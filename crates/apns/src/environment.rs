//! Gateway environments.

use serde::{Deserialize, Deserializer, Serialize};

/// Production gateway host.
pub const PRODUCTION_HOST: &str = "https://api.push.apple.com";

/// Development (sandbox) gateway host.
pub const DEVELOPMENT_HOST: &str = "https://api.development.push.apple.com";

/// Which gateway a device token belongs to.
///
/// Tokens issued to debug builds are only valid against the development host.
/// Anything that is not explicitly development is sent to production.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    /// Parse the wire value. Unknown and empty strings map to production.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("development") || value.eq_ignore_ascii_case("sandbox") {
            Self::Development
        } else {
            Self::Production
        }
    }

    pub fn host(&self) -> &'static str {
        match self {
            Self::Production => PRODUCTION_HOST,
            Self::Development => DEVELOPMENT_HOST,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.as_deref().map(Self::parse).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_environment() {
        assert_eq!(Environment::parse("development"), Environment::Development);
        assert_eq!(Environment::parse("Development"), Environment::Development);
        assert_eq!(Environment::parse("sandbox"), Environment::Development);
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse(""), Environment::Production);
        assert_eq!(Environment::parse("staging"), Environment::Production);
    }

    #[test]
    fn test_deserialize_missing_or_null() {
        let env: Environment = serde_json::from_str("null").unwrap();
        assert_eq!(env, Environment::Production);

        let env: Environment = serde_json::from_str("\"development\"").unwrap();
        assert_eq!(env, Environment::Development);
    }

    #[test]
    fn test_hosts() {
        assert_eq!(Environment::Production.host(), "https://api.push.apple.com");
        assert_eq!(
            Environment::Development.host(),
            "https://api.development.push.apple.com"
        );
    }
}
