//! Validation results and the per-run report.

use crate::component::{AuthComponent, ValidationPass};
use phasegate_config::Environment;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Outcome of one check.
///
/// `details` is diagnostic context for humans only; nothing branches on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthValidationResult {
    pub component: AuthComponent,
    pub pass: ValidationPass,
    pub valid: bool,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
    pub is_critical: bool,
}

impl AuthValidationResult {
    /// Passing result
    #[must_use]
    pub fn ok(component: AuthComponent) -> Self {
        Self {
            component,
            pass: ValidationPass::Primary,
            valid: true,
            error: None,
            details: BTreeMap::new(),
            is_critical: true,
        }
    }

    /// Failing, critical result
    pub fn fail(component: AuthComponent, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            ..Self::ok(component)
        }
    }

    /// Downgrade to non-critical
    #[must_use]
    pub fn advisory(mut self) -> Self {
        self.is_critical = false;
        self
    }

    /// Critical only when `critical` holds
    #[must_use]
    pub fn critical_if(mut self, critical: bool) -> Self {
        self.is_critical = critical;
        self
    }

    #[must_use]
    pub fn in_pass(mut self, pass: ValidationPass) -> Self {
        self.pass = pass;
        self
    }

    #[must_use]
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Invalid and critical: blocks boot
    #[inline]
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        !self.valid && self.is_critical
    }

    /// Invalid but non-critical: logged, never blocks
    #[inline]
    #[must_use]
    pub fn is_advisory_finding(&self) -> bool {
        !self.valid && !self.is_critical
    }
}

/// All results of one validation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthValidationReport {
    pub environment: Environment,
    /// No result is both invalid and critical
    pub success: bool,
    pub results: Vec<AuthValidationResult>,
}

impl AuthValidationReport {
    pub(crate) fn new(environment: Environment, results: Vec<AuthValidationResult>) -> Self {
        let success = !results.iter().any(AuthValidationResult::is_blocking);
        Self {
            environment,
            success,
            results,
        }
    }

    /// The primary-pass result for `component`
    #[must_use]
    pub fn result(&self, component: AuthComponent) -> Option<&AuthValidationResult> {
        self.results
            .iter()
            .find(|r| r.component == component && r.pass == ValidationPass::Primary)
    }

    /// Results that block boot
    pub fn blocking(&self) -> impl Iterator<Item = &AuthValidationResult> {
        self.results.iter().filter(|r| r.is_blocking())
    }

    /// Results that are logged only
    pub fn advisory(&self) -> impl Iterator<Item = &AuthValidationResult> {
        self.results.iter().filter(|r| r.is_advisory_finding())
    }

    /// Results from the production audit pass
    pub fn audit_results(&self) -> impl Iterator<Item = &AuthValidationResult> {
        self.results
            .iter()
            .filter(|r| r.pass == ValidationPass::ProductionAudit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let ok = AuthValidationResult::ok(AuthComponent::CacheConfig);
        let advisory = AuthValidationResult::fail(AuthComponent::CorsOrigins, "empty").advisory();
        let blocking = AuthValidationResult::fail(AuthComponent::JwtSecret, "missing");

        assert!(!ok.is_blocking() && !ok.is_advisory_finding());
        assert!(advisory.is_advisory_finding());
        assert!(blocking.is_blocking());

        let report = AuthValidationReport::new(
            Environment::Development,
            vec![ok, advisory.clone()],
        );
        assert!(report.success);
        assert_eq!(report.advisory().count(), 1);

        let report = AuthValidationReport::new(Environment::Development, vec![advisory, blocking]);
        assert!(!report.success);
        assert_eq!(
            report.blocking().map(|r| r.component).collect::<Vec<_>>(),
            vec![AuthComponent::JwtSecret]
        );
    }

    #[test]
    fn details_serialize_only_when_present() {
        let plain = serde_json::to_value(AuthValidationResult::ok(AuthComponent::TokenExpiry)).unwrap();
        assert!(plain.get("details").is_none());
        assert_eq!(plain["component"], "token_expiry");

        let detailed = AuthValidationResult::fail(AuthComponent::JwtSecret, "short")
            .with_detail("length", 12)
            .with_detail("minimum", 32);
        let json = serde_json::to_value(detailed).unwrap();
        assert_eq!(json["details"]["length"], 12);
        assert_eq!(json["pass"], "primary");
    }
}
