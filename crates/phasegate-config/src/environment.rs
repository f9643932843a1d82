//! Deployment environment discriminator

use crate::provider::{ConfigProvider, ConfigProviderExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Keys consulted for the environment name, in order
pub const ENVIRONMENT_KEYS: [&str; 2] = ["ENVIRONMENT", "APP_ENV"];

/// Deployment environment; changes criticality and thresholds of checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Testing,
    Staging,
    Production,
}

impl Environment {
    /// Resolve from a provider.
    ///
    /// Absent resolves to `Development`. Unknown names also resolve to
    /// `Development` and are logged.
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Self {
        match provider.get_first(&ENVIRONMENT_KEYS) {
            None => Self::Development,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "unrecognised environment name, assuming development");
                Self::Development
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Development or testing: the environments where missing backends are tolerated.
    #[inline]
    #[must_use]
    pub fn is_local(self) -> bool {
        matches!(self, Self::Development | Self::Testing)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognised environment names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown environment: {0}")]
pub struct UnknownEnvironment(pub String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Self::Development),
            "testing" | "test" => Ok(Self::Testing),
            "staging" | "stage" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(UnknownEnvironment(s.to_string())),
        }
    }
}
