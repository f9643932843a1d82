//! Tunable thresholds for the auth checks.
//!
//! Every number and list the checks compare against lives here, so a
//! deployment can tighten or relax them from a TOML file without code changes.

use phasegate_config::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Inclusive numeric range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: i64,
    pub max: i64,
}

/// Where a value falls relative to its [`Bounds`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsCheck {
    Within,
    Below,
    Above,
}

impl Bounds {
    #[must_use]
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn check(self, value: i64) -> BoundsCheck {
        if value < self.min {
            BoundsCheck::Below
        } else if value > self.max {
            BoundsCheck::Above
        } else {
            BoundsCheck::Within
        }
    }
}

/// Thresholds and deny-lists applied by the validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthPolicy {
    /// Values rejected as secrets regardless of length (case-insensitive)
    pub placeholder_secrets: Vec<String>,
    pub jwt_secret_min_length: usize,
    pub service_secret_min_length: usize,
    pub service_secret_min_length_production: usize,
    /// Secrets with fewer distinct characters are low entropy
    pub min_distinct_chars: usize,
    pub access_token_minutes: Bounds,
    pub refresh_token_days: Bounds,
    /// Used when `ACCESS_TOKEN_EXPIRE_MINUTES` is unset
    pub default_access_token_minutes: i64,
    /// Used when `REFRESH_TOKEN_EXPIRE_DAYS` is unset
    pub default_refresh_token_days: i64,
    pub circuit_failure_threshold: Bounds,
    pub circuit_timeout_secs: Bounds,
    pub cache_ttl_secs: Bounds,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            placeholder_secrets: [
                "secret",
                "test-secret",
                "your-secret-key",
                "your-secret-key-here",
                "your-jwt-secret",
                "jwt-secret",
                "jwt_secret",
                "changeme",
                "change-me",
                "change_me",
                "password",
                "default",
                "placeholder",
                "example",
                "development-secret",
                "dev-secret",
                "supersecret",
                "super-secret-key",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            jwt_secret_min_length: 32,
            service_secret_min_length: 32,
            service_secret_min_length_production: 64,
            min_distinct_chars: 6,
            access_token_minutes: Bounds::new(5, 1440),
            refresh_token_days: Bounds::new(1, 90),
            default_access_token_minutes: 30,
            default_refresh_token_days: 7,
            circuit_failure_threshold: Bounds::new(1, 100),
            circuit_timeout_secs: Bounds::new(1, 600),
            cache_ttl_secs: Bounds::new(10, 86_400),
        }
    }
}

impl AuthPolicy {
    /// Whether `value` is on the placeholder deny-list
    #[must_use]
    pub fn is_placeholder(&self, value: &str) -> bool {
        let value = value.trim();
        self.placeholder_secrets
            .iter()
            .any(|p| p.eq_ignore_ascii_case(value))
    }

    /// Parse a policy; unset fields keep their defaults
    pub fn from_toml_str(source: &str, origin: &Path) -> Result<Self, ConfigError> {
        let policy: Self = toml::from_str(source).map_err(|e| ConfigError::Toml {
            path: origin.to_path_buf(),
            message: e.message().to_string(),
        })?;
        policy.check_consistency(origin)?;
        Ok(policy)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source, path)
    }

    fn check_consistency(&self, origin: &Path) -> Result<(), ConfigError> {
        let ranges = [
            ("access_token_minutes", self.access_token_minutes),
            ("refresh_token_days", self.refresh_token_days),
            ("circuit_failure_threshold", self.circuit_failure_threshold),
            ("circuit_timeout_secs", self.circuit_timeout_secs),
            ("cache_ttl_secs", self.cache_ttl_secs),
        ];
        for (name, bounds) in ranges {
            if bounds.min > bounds.max {
                return Err(ConfigError::Toml {
                    path: origin.to_path_buf(),
                    message: format!("{name}: min {} exceeds max {}", bounds.min, bounds.max),
                });
            }
        }
        Ok(())
    }
}
