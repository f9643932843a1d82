//! Error raised when auth validation blocks startup.

use crate::component::AuthComponent;
use crate::result::AuthValidationReport;
use phasegate_config::Environment;

/// A blocking finding, flattened for error reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalFinding {
    pub component: AuthComponent,
    pub message: String,
}

/// One or more critical auth checks failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("auth configuration invalid for {environment}: {}", render(.failures))]
pub struct AuthValidationError {
    pub environment: Environment,
    pub failures: Vec<CriticalFinding>,
}

impl AuthValidationError {
    /// `None` when the report has no blocking result
    #[must_use]
    pub fn from_report(report: &AuthValidationReport) -> Option<Self> {
        let failures: Vec<CriticalFinding> = report
            .blocking()
            .map(|r| CriticalFinding {
                component: r.component,
                message: r.error.clone().unwrap_or_else(|| "invalid".to_string()),
            })
            .collect();

        if failures.is_empty() {
            None
        } else {
            Some(Self {
                environment: report.environment,
                failures,
            })
        }
    }

    #[inline]
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Components with at least one blocking finding, deduplicated
    #[must_use]
    pub fn components(&self) -> Vec<AuthComponent> {
        let mut components: Vec<AuthComponent> = self.failures.iter().map(|f| f.component).collect();
        components.sort();
        components.dedup();
        components
    }
}

fn render(failures: &[CriticalFinding]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.component, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}
