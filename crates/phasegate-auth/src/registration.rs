//! Adapter that runs the validator as a node of the boot graph.

use crate::error::AuthValidationError;
use crate::result::AuthValidationReport;
use crate::validator::AuthConfigValidator;
use async_trait::async_trait;
use phasegate_core::{
    BackoffPolicy, BootContext, InitializationPhase, ReadinessContract, ReadinessProbe,
    ServiceError, ServiceInitializer, ServiceRegistration,
};
use std::sync::Arc;
use std::time::Duration;

/// Name under which the auth node registers
pub const AUTH_SERVICE_NAME: &str = "auth";

/// Runs the validator and publishes the report in the boot context
#[derive(Debug, Clone)]
pub struct AuthInitializer {
    validator: AuthConfigValidator,
}

impl AuthInitializer {
    #[must_use]
    pub fn new(validator: AuthConfigValidator) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl ServiceInitializer for AuthInitializer {
    async fn initialize(&self, ctx: &BootContext) -> Result<(), ServiceError> {
        let report = self.validator.validate_all();
        tracing::info!(
            environment = %report.environment,
            success = report.success,
            results = report.results.len(),
            "auth configuration validated"
        );
        ctx.insert(report);
        Ok(())
    }

    async fn shutdown(&self, ctx: &BootContext) -> Result<(), ServiceError> {
        ctx.remove::<AuthValidationReport>();
        Ok(())
    }
}

/// Ready iff the published report has no critical failure
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthReadiness;

#[async_trait]
impl ReadinessProbe for AuthReadiness {
    async fn check(&self, ctx: &BootContext) -> Result<bool, ServiceError> {
        let Some(report) = ctx.get::<AuthValidationReport>() else {
            return Ok(false);
        };
        match AuthValidationError::from_report(&report) {
            None => Ok(true),
            Some(err) => Err(ServiceError::other(err)),
        }
    }
}

/// Registration for the auth node in `InitializationPhase::Services`.
///
/// Validation is deterministic, so readiness is checked exactly once.
#[must_use]
pub fn auth_service_registration(validator: AuthConfigValidator) -> ServiceRegistration {
    ServiceRegistration::builder(AUTH_SERVICE_NAME, InitializationPhase::Services)
        .initializer(AuthInitializer::new(validator))
        .readiness(
            ReadinessContract::new(AUTH_SERVICE_NAME, AuthReadiness)
                .with_backoff(BackoffPolicy::once())
                .with_timeout(Duration::from_secs(5)),
        )
        .critical(true)
        .build()
}

/// Report published by the auth node, once it has initialized
#[must_use]
pub fn published_report(ctx: &BootContext) -> Option<Arc<AuthValidationReport>> {
    ctx.get::<AuthValidationReport>()
}
