//! The auth configuration validator.
//!
//! Runs one independent check per [`AuthComponent`] and, in production, an
//! extra HTTPS audit of the front-end and back-end URLs. A check never
//! raises: a panic inside one becomes a failing result for that component.

use crate::component::{AuthComponent, ValidationPass};
use crate::keys;
use crate::policy::{AuthPolicy, Bounds, BoundsCheck};
use crate::result::{AuthValidationReport, AuthValidationResult};
use crate::secrets::{assess_secret, SecretIssue};
use phasegate_config::{ConfigProvider, ConfigProviderExt, Environment};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use AuthComponent::{
    AuthServiceUrl, CacheConfig, CircuitBreaker, CorsOrigins, JwtSecret, OAuthCredentials,
    ServiceCredentials, TokenExpiry,
};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Validates auth configuration read through a [`ConfigProvider`].
///
/// Holds no state between runs; two runs over the same configuration
/// produce identical reports.
#[derive(Debug, Clone)]
pub struct AuthConfigValidator {
    provider: Arc<dyn ConfigProvider>,
    policy: AuthPolicy,
    environment: Option<Environment>,
}

impl AuthConfigValidator {
    #[must_use]
    pub fn new(provider: Arc<dyn ConfigProvider>) -> Self {
        Self {
            provider,
            policy: AuthPolicy::default(),
            environment: None,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: AuthPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fix the environment instead of reading it from the provider
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    #[inline]
    #[must_use]
    pub fn policy(&self) -> &AuthPolicy {
        &self.policy
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
            .unwrap_or_else(|| Environment::from_provider(self.provider.as_ref()))
    }

    /// Run every check. `success` is false iff some result is invalid and critical.
    #[must_use]
    pub fn validate_all(&self) -> AuthValidationReport {
        let checks = self.checks();
        let mut results: Vec<AuthValidationResult> = AuthComponent::ALL
            .into_iter()
            .map(|component| checks.run(component))
            .collect();

        if checks.environment.is_production() {
            results.extend(checks.production_audit());
        }

        for result in &results {
            tracing::debug!(
                component = %result.component,
                pass = ?result.pass,
                valid = result.valid,
                critical = result.is_critical,
                "auth check complete"
            );
        }

        AuthValidationReport::new(checks.environment, results)
    }

    /// Run a single check
    #[must_use]
    pub fn validate_component(&self, component: AuthComponent) -> AuthValidationResult {
        self.checks().run(component)
    }

    fn checks(&self) -> Checks<'_> {
        Checks {
            config: self.provider.as_ref(),
            environment: self.environment(),
            policy: &self.policy,
        }
    }
}

struct Checks<'a> {
    config: &'a dyn ConfigProvider,
    environment: Environment,
    policy: &'a AuthPolicy,
}

impl Checks<'_> {
    fn run(&self, component: AuthComponent) -> AuthValidationResult {
        let outcome = catch_unwind(AssertUnwindSafe(|| match component {
            JwtSecret => self.jwt_secret(),
            ServiceCredentials => self.service_credentials(),
            AuthServiceUrl => self.auth_service_url(),
            OAuthCredentials => self.oauth_credentials(),
            CorsOrigins => self.cors_origins(),
            TokenExpiry => self.token_expiry(),
            CircuitBreaker => self.circuit_breaker(),
            CacheConfig => self.cache_config(),
        }));

        match outcome {
            Ok(mut result) => {
                result.component = component;
                result.pass = ValidationPass::Primary;
                result
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(component = %component, panic = %message, "auth check panicked");
                AuthValidationResult::fail(
                    component,
                    format!("internal error while validating {component}: {message}"),
                )
            }
        }
    }

    fn jwt_secret(&self) -> AuthValidationResult {
        let Some(secret) = self.config.get_first(&keys::JWT_SECRET) else {
            return AuthValidationResult::fail(JwtSecret, "JWT secret not configured (set JWT_SECRET_KEY)");
        };

        match assess_secret(&secret, self.policy.jwt_secret_min_length, self.policy) {
            Ok(profile) => AuthValidationResult::ok(JwtSecret)
                .with_detail("length", profile.length)
                .with_detail("hex", profile.hex),
            Err(issue) => secret_failure(JwtSecret, "JWT secret", &issue),
        }
    }

    fn service_credentials(&self) -> AuthValidationResult {
        let minimum = if self.environment.is_production() {
            self.policy.service_secret_min_length_production
        } else {
            self.policy.service_secret_min_length
        };

        let Some(service_id) = self.config.get_trimmed(keys::SERVICE_ID) else {
            return AuthValidationResult::fail(ServiceCredentials, "SERVICE_ID not configured");
        };
        let Some(secret) = self.config.get_trimmed(keys::SERVICE_SECRET) else {
            return AuthValidationResult::fail(ServiceCredentials, "SERVICE_SECRET not configured")
                .with_detail("service_id", service_id);
        };

        let profile = match assess_secret(&secret, minimum, self.policy) {
            Ok(profile) => profile,
            Err(issue) => {
                return secret_failure(ServiceCredentials, "SERVICE_SECRET", &issue)
                    .with_detail("service_id", service_id);
            }
        };

        if self.config.get_first(&keys::JWT_SECRET).as_deref() == Some(secret.as_str()) {
            return AuthValidationResult::fail(
                ServiceCredentials,
                "SERVICE_SECRET must differ from the JWT secret",
            );
        }

        AuthValidationResult::ok(ServiceCredentials)
            .with_detail("service_id", service_id)
            .with_detail("length", profile.length)
    }

    fn auth_service_url(&self) -> AuthValidationResult {
        let enabled = match self.config.get_bool(keys::AUTH_SERVICE_ENABLED) {
            Ok(enabled) => enabled.unwrap_or(true),
            Err(e) => return AuthValidationResult::fail(AuthServiceUrl, e.to_string()),
        };

        let Some(url) = self.config.get_trimmed(keys::AUTH_SERVICE_URL) else {
            if !enabled && self.environment.is_local() {
                return AuthValidationResult::ok(AuthServiceUrl)
                    .advisory()
                    .with_detail("enabled", false);
            }
            return AuthValidationResult::fail(AuthServiceUrl, "AUTH_SERVICE_URL not configured")
                .with_detail("enabled", enabled);
        };

        match split_url(&url) {
            Some((Scheme::Https, _)) => AuthValidationResult::ok(AuthServiceUrl).with_detail("scheme", "https"),
            Some((Scheme::Http, _)) if self.environment.is_production() => AuthValidationResult::fail(
                AuthServiceUrl,
                format!("AUTH_SERVICE_URL must use HTTPS in production (got {url})"),
            ),
            Some((Scheme::Http, _)) => AuthValidationResult::ok(AuthServiceUrl).with_detail("scheme", "http"),
            None => AuthValidationResult::fail(
                AuthServiceUrl,
                format!("AUTH_SERVICE_URL must be an http:// or https:// URL (got {url})"),
            ),
        }
    }

    fn oauth_credentials(&self) -> AuthValidationResult {
        let production = self.environment.is_production();
        let providers = [
            ("google", keys::GOOGLE_CLIENT_ID, keys::GOOGLE_CLIENT_SECRET),
            ("github", keys::GITHUB_CLIENT_ID, keys::GITHUB_CLIENT_SECRET),
        ];

        let mut configured = Vec::new();
        let mut issues = Vec::new();
        for (name, id_key, secret_key) in providers {
            match (self.config.get_trimmed(id_key), self.config.get_trimmed(secret_key)) {
                (Some(_), Some(_)) => configured.push(name),
                (None, None) => {}
                (Some(_), None) => issues.push(format!("{name} OAuth is missing {secret_key}")),
                (None, Some(_)) => issues.push(format!("{name} OAuth is missing {id_key}")),
            }
        }
        if configured.is_empty() {
            issues.push("no OAuth provider configured".to_string());
        }

        if let (Some(redirect), Some(frontend)) = (
            self.config.get_trimmed(keys::OAUTH_REDIRECT_URI),
            self.config.get_trimmed(keys::FRONTEND_URL),
        ) {
            let base = frontend.trim_end_matches('/');
            if redirect != base && !redirect.starts_with(&format!("{base}/")) {
                issues.push(format!(
                    "OAUTH_REDIRECT_URI ({redirect}) does not match FRONTEND_URL ({frontend})"
                ));
            }
        }

        if issues.is_empty() {
            AuthValidationResult::ok(OAuthCredentials).with_detail("providers", configured)
        } else {
            AuthValidationResult::fail(OAuthCredentials, issues.join("; "))
                .critical_if(production)
                .with_detail("providers", configured)
        }
    }

    fn cors_origins(&self) -> AuthValidationResult {
        let origins = self.config.get_list(keys::CORS_ALLOWED_ORIGINS);
        if origins.is_empty() {
            return AuthValidationResult::fail(
                CorsOrigins,
                "CORS_ALLOWED_ORIGINS is empty; cross-origin requests will be refused",
            )
            .advisory();
        }

        let production = self.environment.is_production();
        let wildcard = origins.iter().any(|o| o == "*");
        if wildcard && production {
            return AuthValidationResult::fail(
                CorsOrigins,
                "wildcard CORS origin '*' is not allowed in production",
            );
        }

        let malformed: Vec<String> = origins
            .iter()
            .filter(|o| o.as_str() != "*" && !is_origin(o))
            .cloned()
            .collect();
        if !malformed.is_empty() {
            return AuthValidationResult::fail(
                CorsOrigins,
                format!("malformed CORS origin(s): {}", malformed.join(", ")),
            )
            .critical_if(production)
            .with_detail("malformed", malformed);
        }

        AuthValidationResult::ok(CorsOrigins)
            .with_detail("origins", origins.len())
            .with_detail("wildcard", wildcard)
    }

    fn token_expiry(&self) -> AuthValidationResult {
        let access = match self.bounded(
            TokenExpiry,
            keys::ACCESS_TOKEN_EXPIRE_MINUTES,
            self.policy.access_token_minutes,
            "minutes",
        ) {
            Ok(value) => value.unwrap_or(self.policy.default_access_token_minutes),
            Err(result) => return result,
        };
        let refresh = match self.bounded(
            TokenExpiry,
            keys::REFRESH_TOKEN_EXPIRE_DAYS,
            self.policy.refresh_token_days,
            "days",
        ) {
            Ok(value) => value.unwrap_or(self.policy.default_refresh_token_days),
            Err(result) => return result,
        };

        if refresh.saturating_mul(MINUTES_PER_DAY) <= access {
            return AuthValidationResult::fail(
                TokenExpiry,
                format!(
                    "refresh token lifetime ({refresh} days) does not exceed access token lifetime ({access} minutes)"
                ),
            )
            .advisory();
        }

        AuthValidationResult::ok(TokenExpiry)
            .with_detail("access_token_minutes", access)
            .with_detail("refresh_token_days", refresh)
    }

    fn circuit_breaker(&self) -> AuthValidationResult {
        let threshold = self.bounded(
            CircuitBreaker,
            keys::AUTH_CIRCUIT_FAILURE_THRESHOLD,
            self.policy.circuit_failure_threshold,
            "failures",
        );
        let timeout = self.bounded(
            CircuitBreaker,
            keys::AUTH_CIRCUIT_TIMEOUT,
            self.policy.circuit_timeout_secs,
            "seconds",
        );

        match (threshold, timeout) {
            (Ok(threshold), Ok(timeout)) => {
                let mut result = AuthValidationResult::ok(CircuitBreaker).advisory();
                if let Some(threshold) = threshold {
                    result = result.with_detail("failure_threshold", threshold);
                }
                if let Some(timeout) = timeout {
                    result = result.with_detail("timeout_secs", timeout);
                }
                result
            }
            (Err(result), _) | (_, Err(result)) => result.advisory(),
        }
    }

    fn cache_config(&self) -> AuthValidationResult {
        let enabled = match self.config.get_bool(keys::AUTH_CACHE_ENABLED) {
            Ok(enabled) => enabled.unwrap_or(true),
            Err(e) => return AuthValidationResult::fail(CacheConfig, e.to_string()).advisory(),
        };
        if !enabled {
            return AuthValidationResult::ok(CacheConfig)
                .advisory()
                .with_detail("enabled", false);
        }

        match self.bounded(CacheConfig, keys::AUTH_CACHE_TTL, self.policy.cache_ttl_secs, "seconds") {
            Ok(ttl) => {
                let result = AuthValidationResult::ok(CacheConfig)
                    .advisory()
                    .with_detail("enabled", true);
                match ttl {
                    Some(ttl) => result.with_detail("ttl_secs", ttl),
                    None => result,
                }
            }
            Err(result) => result.advisory(),
        }
    }

    /// Whole number under `key` within `bounds`; `None` when unset
    fn bounded(
        &self,
        component: AuthComponent,
        key: &str,
        bounds: Bounds,
        unit: &str,
    ) -> Result<Option<i64>, AuthValidationResult> {
        let Some(raw) = self.config.get_trimmed(key) else {
            return Ok(None);
        };
        let Ok(value) = raw.parse::<i64>() else {
            return Err(AuthValidationResult::fail(
                component,
                format!("{key} must be a whole number of {unit} (got '{raw}')"),
            )
            .with_detail("value", raw));
        };

        match bounds.check(value) {
            BoundsCheck::Within => Ok(Some(value)),
            BoundsCheck::Below => Err(AuthValidationResult::fail(
                component,
                format!("{key} is too low: {value} {unit} is below the minimum of {} {unit}", bounds.min),
            )
            .with_detail("value", value)
            .with_detail("minimum", bounds.min)),
            BoundsCheck::Above => Err(AuthValidationResult::fail(
                component,
                format!("{key} is too high: {value} {unit} exceeds the maximum of {} {unit}", bounds.max),
            )
            .with_detail("value", value)
            .with_detail("maximum", bounds.max)),
        }
    }

    fn production_audit(&self) -> Vec<AuthValidationResult> {
        [
            (keys::FRONTEND_URL, CorsOrigins),
            (keys::BACKEND_URL, AuthServiceUrl),
        ]
        .into_iter()
        .filter_map(|(key, component)| {
            // Unset URLs are left to the primary checks
            let url = self.config.get_trimmed(key)?;
            let issue = match split_url(&url) {
                Some((Scheme::Https, _)) => return None,
                Some((Scheme::Http, _)) => format!("{key} must use HTTPS in production (got {url})"),
                None => format!("{key} must be an https:// URL (got {url})"),
            };
            Some(
                AuthValidationResult::fail(component, issue)
                    .in_pass(ValidationPass::ProductionAudit)
                    .with_detail("key", key),
            )
        })
        .collect()
    }
}

fn secret_failure(component: AuthComponent, label: &str, issue: &SecretIssue) -> AuthValidationResult {
    let result = AuthValidationResult::fail(component, format!("{label} {issue}"));
    match *issue {
        SecretIssue::TooShort { length, minimum } => result
            .with_detail("length", length)
            .with_detail("minimum", minimum),
        SecretIssue::LowEntropy { classes, distinct } => result
            .with_detail("character_classes", classes)
            .with_detail("distinct_characters", distinct),
        SecretIssue::Empty | SecretIssue::Placeholder => result,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    Http,
    Https,
}

/// Scheme and host of an `http(s)://` URL; `None` when malformed
fn split_url(url: &str) -> Option<(Scheme, &str)> {
    let lower = url.to_ascii_lowercase();
    let (scheme, rest) = if lower.starts_with("https://") {
        (Scheme::Https, &url["https://".len()..])
    } else if lower.starts_with("http://") {
        (Scheme::Http, &url["http://".len()..])
    } else {
        return None;
    };

    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return None;
    }
    Some((scheme, host))
}

/// `scheme://host[:port]` with no path
fn is_origin(origin: &str) -> bool {
    split_url(origin).is_some_and(|(_, host)| {
        let scheme_len = origin.find("://").map_or(0, |i| i + 3);
        origin[scheme_len..].trim_end_matches('/') == host
    })
}
