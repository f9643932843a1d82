//! End-to-end boots of the demo graph.

use phasegate_auth::AUTH_SERVICE_NAME;
use phasegate_boot::commands::{self, EXIT_AUTH_INVALID, EXIT_BOOT_FAILED};
use phasegate_boot::demo::{AGENT_RUNTIME, CACHE, DATABASE, GATEWAY};
use phasegate_boot::{build_orchestrator, DemoOptions, DEMO_SERVICES};
use phasegate_config::{ConfigProvider, MapProvider};
use phasegate_core::{FailureReason, ServiceState};
use phasegate_test_utils::complete_auth_config;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn config(provider: MapProvider) -> Arc<dyn ConfigProvider> {
    Arc::new(provider.with("BOOT_LOG_TRANSITIONS", "false"))
}

#[tokio::test(start_paused = true)]
async fn demo_graph_boots_cleanly() {
    let orch = build_orchestrator(config(complete_auth_config("development")), &DemoOptions::default())
        .unwrap();
    let report = orch.initialize_all().await.unwrap();

    assert!(report.success, "{}", report.generate_text());
    assert!(!report.is_degraded());
    let mut ready = report.ready_services();
    ready.sort_unstable();
    let mut expected = DEMO_SERVICES.to_vec();
    expected.sort_unstable();
    assert_eq!(ready, expected);

    let database = report.service(DATABASE).unwrap();
    assert_eq!(database.readiness_attempts, 3);

    let shutdown = orch.shutdown().await;
    assert!(shutdown.is_clean());
    assert_eq!(shutdown.stopped.first().map(String::as_str), Some(GATEWAY));
    assert_eq!(shutdown.stopped.last().map(String::as_str), Some(DATABASE));
}

/// Tenet: losing a non-critical service degrades the boot instead of failing it.
#[tokio::test(start_paused = true)]
async fn failed_cache_degrades_runtime() {
    let orch = build_orchestrator(
        config(complete_auth_config("development")),
        &DemoOptions::default().failing(CACHE),
    )
    .unwrap();
    let report = orch.initialize_all().await.unwrap();

    assert!(report.success);
    assert!(report.is_degraded());
    assert_eq!(orch.service_state(CACHE), Some(ServiceState::Failed));
    assert!(orch.is_ready(GATEWAY));
    assert_eq!(
        report.service(AGENT_RUNTIME).unwrap().degraded_dependencies,
        vec![CACHE.to_string()]
    );
}

/// Tenet: a critical failure stops everything not yet started.
#[tokio::test(start_paused = true)]
async fn failed_database_aborts_boot() {
    let orch = build_orchestrator(
        config(complete_auth_config("development")),
        &DemoOptions::default().failing(DATABASE),
    )
    .unwrap();
    let report = orch.initialize_all().await.unwrap();

    assert!(!report.success);
    assert_eq!(report.critical_failure.as_deref(), Some(DATABASE));
    assert!(matches!(
        report.service(DATABASE).unwrap().failure,
        Some(FailureReason::InitializerFailed { .. })
    ));
    for service in [CACHE, AUTH_SERVICE_NAME, AGENT_RUNTIME, GATEWAY] {
        assert_eq!(orch.service_state(service), Some(ServiceState::Pending), "{service}");
    }
}

#[tokio::test(start_paused = true)]
async fn boot_command_reports_json() {
    let output = commands::boot(
        config(complete_auth_config("staging")),
        DemoOptions::default(),
        true,
    )
    .await
    .unwrap();
    assert_eq!(output.exit_code, 0);

    let json: serde_json::Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(json["startup"]["success"], true);
    assert_eq!(json["shutdown"]["stopped"].as_array().unwrap().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn boot_command_exit_codes() {
    let bad_auth = commands::boot(
        config(complete_auth_config("production").without("JWT_SECRET_KEY")),
        DemoOptions::default(),
        false,
    )
    .await
    .unwrap();
    assert_eq!(bad_auth.exit_code, EXIT_AUTH_INVALID);
    assert!(bad_auth.stdout.contains("jwt_secret"));

    let bad_boot = commands::boot(
        config(complete_auth_config("development")),
        DemoOptions::default().failing(AGENT_RUNTIME),
        false,
    )
    .await
    .unwrap();
    assert_eq!(bad_boot.exit_code, EXIT_BOOT_FAILED);
    assert!(bad_boot.stdout.contains("FAILED"));
    assert!(bad_boot.stdout.contains("Shutdown: 3 service(s) stopped"));
}

#[test]
fn validate_auth_command_summarizes() {
    let output = commands::validate_auth(
        config(complete_auth_config("production").with("CORS_ALLOWED_ORIGINS", "*")),
        phasegate_auth::AuthPolicy::default(),
        false,
    )
    .unwrap();
    assert_eq!(output.exit_code, EXIT_AUTH_INVALID);
    assert!(output.stdout.contains("[CRITICAL] cors_origins"));

    let clean = commands::validate_auth(
        config(complete_auth_config("testing")),
        phasegate_auth::AuthPolicy::default(),
        true,
    )
    .unwrap();
    assert_eq!(clean.exit_code, 0);
    let json: serde_json::Value = serde_json::from_str(&clean.stdout).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 8);
}

#[test]
fn phases_lists_demo_services() {
    let output = commands::phases();
    assert_eq!(
        output.stdout,
        "1. bootstrap\n2. dependencies\n3. database: database\n4. cache: cache\n5. services: auth, agent-runtime\n6. integration: websocket-gateway\n"
    );
}
