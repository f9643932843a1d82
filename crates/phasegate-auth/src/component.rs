//! Closed set of checked components.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One validated area of the auth configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthComponent {
    JwtSecret,
    ServiceCredentials,
    AuthServiceUrl,
    OAuthCredentials,
    CorsOrigins,
    TokenExpiry,
    CircuitBreaker,
    CacheConfig,
}

impl AuthComponent {
    /// Every component, in check order
    pub const ALL: [AuthComponent; 8] = [
        Self::JwtSecret,
        Self::ServiceCredentials,
        Self::AuthServiceUrl,
        Self::OAuthCredentials,
        Self::CorsOrigins,
        Self::TokenExpiry,
        Self::CircuitBreaker,
        Self::CacheConfig,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JwtSecret => "jwt_secret",
            Self::ServiceCredentials => "service_credentials",
            Self::AuthServiceUrl => "auth_service_url",
            Self::OAuthCredentials => "oauth_credentials",
            Self::CorsOrigins => "cors_origins",
            Self::TokenExpiry => "token_expiry",
            Self::CircuitBreaker => "circuit_breaker",
            Self::CacheConfig => "cache_config",
        }
    }
}

impl fmt::Display for AuthComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pass of a validation run produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPass {
    /// The per-component checks; exactly one result per component
    #[default]
    Primary,
    /// Additional production-only checks, appended only on violation
    ProductionAudit,
}
