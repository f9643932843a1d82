//! The validator as a node of the boot graph.

use phasegate_auth::{
    auth_service_registration, published_report, AuthConfigValidator, AUTH_SERVICE_NAME,
};
use phasegate_core::{
    FailureReason, InitializationPhase, LifecycleOrchestrator, OrchestratorConfig, PhaseStatus,
    ServiceDependency, ServiceState,
};
use phasegate_test_utils::{complete_auth_config, scripted_service, CallLog, Script};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn orchestrator(provider: phasegate_config::MapProvider) -> LifecycleOrchestrator {
    let orch = LifecycleOrchestrator::new(
        OrchestratorConfig::new().without_transition_logging(),
        Arc::new(provider),
    );
    let validator = AuthConfigValidator::new(orch.context().config_arc());
    orch.register_service(auth_service_registration(validator)).unwrap();
    orch
}

#[tokio::test(start_paused = true)]
async fn valid_configuration_makes_auth_ready() {
    let orch = orchestrator(complete_auth_config("staging"));
    let report = orch.initialize_all().await.unwrap();

    assert!(report.success);
    assert!(orch.is_ready(AUTH_SERVICE_NAME));
    assert_eq!(orch.phase_of(AUTH_SERVICE_NAME), Some(InitializationPhase::Services));

    let published = published_report(orch.context()).unwrap();
    assert!(published.success);
    assert_eq!(published.results.len(), 8);

    orch.shutdown().await;
    assert!(published_report(orch.context()).is_none());
}

/// Tenet: a critical auth finding fails the node and aborts the boot.
#[tokio::test(start_paused = true)]
async fn critical_finding_aborts_boot() {
    let orch = orchestrator(complete_auth_config("production").without("JWT_SECRET_KEY"));
    let log = CallLog::new();
    orch.register_service(
        scripted_service("gateway", InitializationPhase::Integration, &log, Script::Succeed),
    )
    .unwrap();
    orch.register_service(
        phasegate_core::ServiceRegistration::builder("agent-runtime", InitializationPhase::Integration)
            .depends_on(ServiceDependency::new(AUTH_SERVICE_NAME))
            .build(),
    )
    .unwrap();

    let report = orch.initialize_all().await.unwrap();

    assert!(!report.success);
    assert_eq!(report.critical_failure.as_deref(), Some(AUTH_SERVICE_NAME));
    assert_eq!(orch.service_state(AUTH_SERVICE_NAME), Some(ServiceState::Failed));
    assert_eq!(orch.service_state("agent-runtime"), Some(ServiceState::Pending));
    assert!(log.entries().is_empty());

    let outcome = report.service(AUTH_SERVICE_NAME).unwrap();
    match outcome.failure.as_ref().unwrap() {
        FailureReason::ReadinessExhausted { attempts, last_error } => {
            assert_eq!(*attempts, 1);
            assert!(last_error.as_deref().unwrap().contains("jwt_secret"));
        }
        other => panic!("unexpected failure: {other:?}"),
    }

    let integration = report
        .phases
        .iter()
        .find(|p| p.phase == InitializationPhase::Integration)
        .unwrap();
    assert_eq!(integration.status, PhaseStatus::Skipped);
}
