//! Startup entry point: validate once, log one consolidated summary, raise
//! a single aggregate error on any critical failure.

use crate::error::AuthValidationError;
use crate::result::{AuthValidationReport, AuthValidationResult};
use crate::validator::AuthConfigValidator;
use phasegate_config::Environment;
use serde::Serialize;

/// Counts of one validation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthValidationSummary {
    pub environment: Environment,
    pub passed: usize,
    pub advisory: usize,
    pub critical: usize,
}

impl AuthValidationSummary {
    #[must_use]
    pub fn from_report(report: &AuthValidationReport) -> Self {
        Self {
            environment: report.environment,
            passed: report.results.iter().filter(|r| r.valid).count(),
            advisory: report.advisory().count(),
            critical: report.blocking().count(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.critical > 0
    }
}

/// Multi-line summary naming every finding, critical ones first
#[must_use]
pub fn render_summary(report: &AuthValidationReport) -> String {
    let summary = AuthValidationSummary::from_report(report);
    let verdict = if summary.is_blocking() {
        "FAILED"
    } else if summary.advisory > 0 {
        "PASSED WITH WARNINGS"
    } else {
        "PASSED"
    };

    let mut out = String::new();
    out.push_str(&format!(
        "Auth configuration ({}): {verdict}\n",
        summary.environment
    ));
    out.push_str(&format!(
        "  passed: {}  advisory: {}  critical: {}\n",
        summary.passed, summary.advisory, summary.critical
    ));

    for result in report.blocking() {
        out.push_str(&finding_line("CRITICAL", result));
    }
    for result in report.advisory() {
        out.push_str(&finding_line("ADVISORY", result));
    }

    out
}

fn finding_line(label: &str, result: &AuthValidationResult) -> String {
    format!(
        "  [{label}] {}: {}\n",
        result.component,
        result.error.as_deref().unwrap_or("invalid")
    )
}

/// Run every check and fail if any critical one failed.
///
/// The summary is logged once, after all checks, so operators see the whole
/// set of problems in a single attempt.
pub fn validate_auth_at_startup(
    validator: &AuthConfigValidator,
) -> Result<AuthValidationReport, AuthValidationError> {
    let report = validator.validate_all();
    let summary = AuthValidationSummary::from_report(&report);
    let rendered = render_summary(&report);

    if summary.is_blocking() {
        tracing::error!(
            environment = %summary.environment,
            passed = summary.passed,
            advisory = summary.advisory,
            critical = summary.critical,
            "auth configuration validation failed\n{rendered}"
        );
    } else if summary.advisory > 0 {
        tracing::warn!(
            environment = %summary.environment,
            passed = summary.passed,
            advisory = summary.advisory,
            "auth configuration valid with advisory findings\n{rendered}"
        );
    } else {
        tracing::info!(
            environment = %summary.environment,
            passed = summary.passed,
            "auth configuration valid"
        );
    }

    match AuthValidationError::from_report(&report) {
        Some(err) => Err(err),
        None => Ok(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::AuthComponent;

    #[test]
    fn summary_lists_critical_before_advisory() {
        let report = AuthValidationReport::new(
            Environment::Staging,
            vec![
                AuthValidationResult::fail(AuthComponent::CorsOrigins, "CORS_ALLOWED_ORIGINS is empty").advisory(),
                AuthValidationResult::ok(AuthComponent::TokenExpiry),
                AuthValidationResult::fail(AuthComponent::JwtSecret, "JWT secret not configured"),
            ],
        );

        let summary = AuthValidationSummary::from_report(&report);
        assert_eq!((summary.passed, summary.advisory, summary.critical), (1, 1, 1));

        let text = render_summary(&report);
        assert!(text.starts_with("Auth configuration (staging): FAILED"));
        let critical = text.find("[CRITICAL] jwt_secret").unwrap();
        let advisory = text.find("[ADVISORY] cors_origins").unwrap();
        assert!(critical < advisory);
    }
}
