//! Functional tests for shutdown, notifications, and shared boot context.

use phasegate_config::MapProvider;
use phasegate_core::{
    FnInitializer, InitializationPhase, LifecycleOrchestrator, OrchestratorConfig,
    OrchestratorError, ReadinessContract, ServiceError, ServiceRegistration, ServiceState,
};
use phasegate_test_utils::{
    quiet_orchestrator, scripted_service, CallLog, RecordingObserver, Script, ScriptedInitializer,
    ScriptedProbe,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use InitializationPhase::{Cache, Database, Services};

/// Tenet: shutdown is best-effort and total; teardown errors never stop it.
#[tokio::test(start_paused = true)]
async fn shutdown_runs_in_reverse_and_collects_failures() {
    let orch = LifecycleOrchestrator::new(
        OrchestratorConfig::new()
            .without_transition_logging()
            .with_shutdown_timeout(Duration::from_secs(1)),
        Arc::new(MapProvider::new()),
    );
    let log = CallLog::new();

    orch.register_service(scripted_service("db", Database, &log, Script::Succeed))
        .unwrap();
    orch.register_service(
        ServiceRegistration::builder("cache", Cache)
            .initializer(ScriptedInitializer::new("cache", &log).on_teardown(Script::Hang))
            .build(),
    )
    .unwrap();
    orch.register_service(
        ServiceRegistration::builder("api", Services)
            .initializer(
                ScriptedInitializer::new("api", &log)
                    .on_teardown(Script::Fail("socket busy".into())),
            )
            .build(),
    )
    .unwrap();

    assert!(orch.initialize_all().await.unwrap().success);
    let report = orch.shutdown().await;

    assert_eq!(log.with_prefix("teardown:"), vec!["api", "cache", "db"]);
    assert_eq!(report.stopped, vec!["db".to_string()]);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].service, "api");
    assert_eq!(report.failures[0].message, "socket busy");
    assert_eq!(report.failures[1].message, "teardown timed out after 1000ms");
    assert!(!report.is_clean());

    let again = orch.shutdown().await;
    assert!(again.already_shut_down);
    assert_eq!(log.with_prefix("teardown:").len(), 3);
}

/// Tenet: only services whose initializer succeeded are torn down, in
/// reverse order of completion, even when readiness later failed.
#[tokio::test(start_paused = true)]
async fn teardown_follows_completion_order() {
    let orch = quiet_orchestrator();
    let log = CallLog::new();

    orch.register_service(
        ServiceRegistration::builder("slow", Services)
            .initializer(
                ScriptedInitializer::new("slow", &log).on_init(Script::Delay(Duration::from_secs(2))),
            )
            .build(),
    )
    .unwrap();
    orch.register_service(
        ServiceRegistration::builder("fast", Services)
            .initializer(
                ScriptedInitializer::new("fast", &log).on_init(Script::Delay(Duration::from_secs(1))),
            )
            .readiness(ReadinessContract::new("fast", ScriptedProbe::never_ready()).with_retries(0, Duration::ZERO))
            .critical(false)
            .build(),
    )
    .unwrap();
    orch.register_service(
        ServiceRegistration::builder("broken", Services)
            .initializer(ScriptedInitializer::new("broken", &log).on_init(Script::Fail("no".into())))
            .critical(false)
            .build(),
    )
    .unwrap();

    let report = orch.initialize_all().await.unwrap();
    assert_eq!(report.state_of("fast"), Some(ServiceState::Failed));

    let shutdown = orch.shutdown().await;
    assert_eq!(shutdown.stopped, vec!["slow".to_string(), "fast".to_string()]);
    assert!(!log.contains("teardown:broken"));
}

#[tokio::test]
async fn shutdown_before_boot_refuses_boot() {
    let orch = quiet_orchestrator();
    let log = CallLog::new();
    orch.register_service(scripted_service("db", Database, &log, Script::Succeed))
        .unwrap();

    let early = orch.shutdown().await;
    assert!(early.stopped.is_empty());
    assert!(!early.already_shut_down);

    assert!(matches!(orch.initialize_all().await, Err(OrchestratorError::ShutDown)));
    assert!(!log.contains("init:db"));
    assert_eq!(orch.service_state("db"), Some(ServiceState::Pending));
    assert!(orch.shutdown().await.already_shut_down);
}

/// Tenet: a service that finishes booting after shutdown began is still
/// torn down by the next shutdown, exactly once.
#[tokio::test(start_paused = true)]
async fn shutdown_during_boot_leaves_late_services_for_next_call() {
    let orch = quiet_orchestrator();
    let log = CallLog::new();
    orch.register_service(scripted_service(
        "db",
        Database,
        &log,
        Script::Delay(Duration::from_secs(2)),
    ))
    .unwrap();

    let (boot, early) = tokio::join!(orch.initialize_all(), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        orch.shutdown().await
    });
    assert!(early.stopped.is_empty());
    assert!(!early.already_shut_down);
    assert_eq!(boot.unwrap().ready_services(), vec!["db"]);

    let late = orch.shutdown().await;
    assert!(!late.already_shut_down);
    assert_eq!(late.stopped, vec!["db".to_string()]);
    assert!(log.contains("teardown:db"));

    assert!(orch.shutdown().await.already_shut_down);
    assert_eq!(log.with_prefix("teardown:").len(), 1);
}

#[tokio::test]
async fn observers_see_every_transition_in_order() {
    let orch = quiet_orchestrator();
    let observer = RecordingObserver::new();
    orch.subscribe_observer(observer.clone());
    let mut events = orch.subscribe();
    let log = CallLog::new();

    orch.register_service(scripted_service("db", Database, &log, Script::Succeed))
        .unwrap();
    orch.register_service(
        ServiceRegistration::builder("cache", Cache)
            .initializer(ScriptedInitializer::new("cache", &log).on_init(Script::Fail("refused".into())))
            .critical(false)
            .build(),
    )
    .unwrap();

    orch.initialize_all().await.unwrap();

    assert_eq!(
        observer.transitions_for("db"),
        vec![
            (ServiceState::Pending, ServiceState::Initializing),
            (ServiceState::Initializing, ServiceState::Ready),
        ]
    );
    assert_eq!(
        observer.transitions_for("cache"),
        vec![
            (ServiceState::Pending, ServiceState::Initializing),
            (ServiceState::Initializing, ServiceState::Failed),
        ]
    );
    let failed = observer
        .changes()
        .into_iter()
        .find(|c| c.new_state == ServiceState::Failed)
        .unwrap();
    assert_eq!(failed.reason.as_deref(), Some("initializer failed: refused"));
    assert_eq!(failed.phase, Cache);

    let mut broadcast = Vec::new();
    while let Ok(change) = events.try_recv() {
        broadcast.push((change.service, change.new_state));
    }
    assert_eq!(broadcast.len(), 4);
    assert_eq!(broadcast[0], ("db".to_string(), ServiceState::Initializing));
}

/// Tenet: observability can never break boot.
#[tokio::test]
async fn panicking_callback_is_swallowed() {
    let orch = quiet_orchestrator();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    orch.add_state_change_callback(|name, _, _| panic!("callback for {name} exploded"));
    orch.add_state_change_callback(move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    orch.register_service(ServiceRegistration::builder("db", Database).build())
        .unwrap();

    let report = orch.initialize_all().await.unwrap();
    assert!(report.success);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[derive(Debug)]
struct Pool {
    url: String,
}

/// Tenet: resources published by an early phase are visible to later phases.
#[tokio::test]
async fn context_carries_resources_between_phases() {
    let orch = LifecycleOrchestrator::new(
        OrchestratorConfig::new().without_transition_logging(),
        Arc::new(MapProvider::new().with("DATABASE_URL", "postgres://db/app")),
    );

    orch.register_service(
        ServiceRegistration::builder("db", Database)
            .initializer(
                FnInitializer::new(|ctx| async move {
                    let url = ctx
                        .config()
                        .get("DATABASE_URL")
                        .ok_or_else(|| ServiceError::msg("DATABASE_URL not set"))?;
                    ctx.insert(Pool { url });
                    Ok(())
                })
                .with_teardown(|ctx| async move {
                    ctx.remove::<Pool>();
                    Ok(())
                }),
            )
            .build(),
    )
    .unwrap();
    orch.register_service(
        ServiceRegistration::builder("api", Services)
            .requires("db")
            .initialize_with(|ctx| async move {
                let pool = ctx
                    .get::<Pool>()
                    .ok_or_else(|| ServiceError::msg("no pool"))?;
                ctx.insert_named("api.database", pool.url.clone());
                Ok(())
            })
            .build(),
    )
    .unwrap();

    let report = orch.initialize_all().await.unwrap();
    assert!(report.success);
    assert_eq!(
        orch.context().get_named::<String>("api.database").as_deref().map(String::as_str),
        Some("postgres://db/app")
    );

    orch.shutdown().await;
    assert!(!orch.context().contains::<Pool>());
}

#[tokio::test]
async fn report_serializes_and_renders() {
    let orch = quiet_orchestrator();
    let log = CallLog::new();
    orch.register_service(scripted_service("db", Database, &log, Script::Fail("auth failed".into())))
        .unwrap();
    orch.register_service(scripted_service("api", Services, &log, Script::Succeed))
        .unwrap();

    let report = orch.initialize_all().await.unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["aborted_in"], "database");
    assert_eq!(json["services"][0]["state"], "failed");
    assert_eq!(json["services"][0]["failure"]["kind"], "initializer_failed");
    assert_eq!(json["services"][1]["state"], "pending");

    let text = report.generate_text();
    assert!(text.contains("FAILED"));
    assert!(text.contains("Aborted in phase database: critical service 'db' failed"));
    assert_eq!(report.pending_services(), vec!["api"]);
}

#[test]
fn orchestrator_reads_its_config_from_provider() {
    let provider = Arc::new(
        MapProvider::new()
            .with("BOOT_SHUTDOWN_TIMEOUT_SECS", "2")
            .with("BOOT_LOG_TRANSITIONS", "false"),
    );
    let orch = LifecycleOrchestrator::from_provider(provider).unwrap();
    assert_eq!(orch.config().shutdown_timeout, Duration::from_secs(2));
    assert!(!orch.config().log_transitions);
    assert_eq!(orch.phase_of("db"), None);
    assert!(orch.states().is_empty());
}
