//! Testing utilities for the phasegate workspace
//!
//! Shared test helpers, fixtures, and assertions.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use phasegate_config::MapProvider;
use phasegate_core::{
    BootContext, InitializationPhase, LifecycleOrchestrator, ObserverError, OrchestratorConfig,
    ReadinessProbe, ServiceError, ServiceInitializer, ServiceRegistration, ServiceState,
    StateChange, StateObserver,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 48 mixed-case alphanumeric characters
pub const STRONG_JWT_SECRET: &str = "k8Jf2nQ7vR4xT1wZ9bL6mC3pH5sD0gYaE7uN2cW4qX8zV1rT";

/// 64 hex characters, distinct from [`STRONG_JWT_SECRET`]
pub const STRONG_SERVICE_SECRET: &str =
    "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

/// Auth configuration that passes every check in `environment`
pub fn complete_auth_config(environment: &str) -> MapProvider {
    let production = environment == "production";
    let (frontend, backend, auth_url) = if production {
        (
            "https://app.example.com",
            "https://api.example.com",
            "https://auth.example.com",
        )
    } else {
        (
            "http://localhost:3000",
            "http://localhost:8000",
            "http://localhost:8001",
        )
    };

    MapProvider::new()
        .with("ENVIRONMENT", environment)
        .with("JWT_SECRET_KEY", STRONG_JWT_SECRET)
        .with("SERVICE_ID", "netra-backend")
        .with("SERVICE_SECRET", STRONG_SERVICE_SECRET)
        .with("AUTH_SERVICE_URL", auth_url)
        .with("AUTH_SERVICE_ENABLED", "true")
        .with("GOOGLE_CLIENT_ID", "google-client-id.apps.example.com")
        .with("GOOGLE_CLIENT_SECRET", "google-client-secret-value")
        .with("OAUTH_REDIRECT_URI", format!("{frontend}/auth/callback"))
        .with("CORS_ALLOWED_ORIGINS", frontend)
        .with("FRONTEND_URL", frontend)
        .with("BACKEND_URL", backend)
        .with("ACCESS_TOKEN_EXPIRE_MINUTES", "30")
        .with("REFRESH_TOKEN_EXPIRE_DAYS", "7")
        .with("AUTH_CIRCUIT_FAILURE_THRESHOLD", "5")
        .with("AUTH_CIRCUIT_TIMEOUT", "30")
        .with("AUTH_CACHE_TTL", "300")
        .with("AUTH_CACHE_ENABLED", "true")
}

/// Orchestrator over an empty provider with transition logging disabled
pub fn quiet_orchestrator() -> LifecycleOrchestrator {
    LifecycleOrchestrator::new(
        OrchestratorConfig::new().without_transition_logging(),
        Arc::new(MapProvider::new()),
    )
}

/// Shared, ordered record of hook invocations (`init:db`, `teardown:db`)
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Entries with the given prefix, prefix stripped
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter_map(|e| e.strip_prefix(prefix).map(str::to_string))
            .collect()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().iter().any(|e| e == entry)
    }
}

/// What a scripted hook does when invoked
#[derive(Debug, Clone)]
pub enum Script {
    Succeed,
    Fail(String),
    /// Never completes
    Hang,
    /// Sleep, then succeed
    Delay(Duration),
    Panic,
}

/// Initializer whose behaviour is fixed up front and whose calls are logged
#[derive(Debug, Clone)]
pub struct ScriptedInitializer {
    name: String,
    log: CallLog,
    init: Script,
    teardown: Script,
}

impl ScriptedInitializer {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            init: Script::Succeed,
            teardown: Script::Succeed,
        }
    }

    #[must_use]
    pub fn on_init(mut self, script: Script) -> Self {
        self.init = script;
        self
    }

    #[must_use]
    pub fn on_teardown(mut self, script: Script) -> Self {
        self.teardown = script;
        self
    }
}

async fn run_script(script: &Script) -> Result<(), ServiceError> {
    match script {
        Script::Succeed => Ok(()),
        Script::Fail(message) => Err(ServiceError::msg(message.clone())),
        Script::Hang => {
            std::future::pending::<()>().await;
            Ok(())
        }
        Script::Delay(d) => {
            tokio::time::sleep(*d).await;
            Ok(())
        }
        Script::Panic => panic!("scripted panic"),
    }
}

#[async_trait]
impl ServiceInitializer for ScriptedInitializer {
    async fn initialize(&self, _ctx: &BootContext) -> Result<(), ServiceError> {
        self.log.record(format!("init:{}", self.name));
        run_script(&self.init).await
    }

    async fn shutdown(&self, _ctx: &BootContext) -> Result<(), ServiceError> {
        self.log.record(format!("teardown:{}", self.name));
        run_script(&self.teardown).await
    }
}

/// Readiness probe that reports ready from attempt `ready_after` onwards
#[derive(Debug)]
pub struct ScriptedProbe {
    ready_after: Option<u32>,
    error: Option<String>,
    attempts: Arc<AtomicU32>,
}

impl ScriptedProbe {
    /// Ready on the `n`th attempt (1-based)
    pub fn ready_after(n: u32) -> Self {
        Self {
            ready_after: Some(n),
            error: None,
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn never_ready() -> Self {
        Self {
            ready_after: None,
            error: None,
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Every attempt returns this error
    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::never_ready()
        }
    }

    /// Handle for reading the attempt count after the probe is moved
    pub fn attempts(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.attempts)
    }
}

#[async_trait]
impl ReadinessProbe for ScriptedProbe {
    async fn check(&self, _ctx: &BootContext) -> Result<bool, ServiceError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(message) = &self.error {
            return Err(ServiceError::msg(message.clone()));
        }
        Ok(self.ready_after.is_some_and(|n| attempt >= n))
    }
}

/// Observer that keeps every change it sees
#[derive(Debug, Default)]
pub struct RecordingObserver {
    changes: Mutex<Vec<StateChange>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn changes(&self) -> Vec<StateChange> {
        self.changes.lock().clone()
    }

    /// `(old, new)` pairs for one service, in order
    pub fn transitions_for(&self, service: &str) -> Vec<(ServiceState, ServiceState)> {
        self.changes
            .lock()
            .iter()
            .filter(|c| c.service == service)
            .map(|c| (c.old_state, c.new_state))
            .collect()
    }

    /// Services in the order they first reached `state`
    pub fn reached(&self, state: ServiceState) -> Vec<String> {
        self.changes
            .lock()
            .iter()
            .filter(|c| c.new_state == state)
            .map(|c| c.service.clone())
            .collect()
    }
}

impl StateObserver for RecordingObserver {
    fn on_state_change(&self, change: &StateChange) -> Result<(), ObserverError> {
        self.changes.lock().push(change.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Registration using a [`ScriptedInitializer`] that logs into `log`
pub fn scripted_service(
    name: &str,
    phase: InitializationPhase,
    log: &CallLog,
    script: Script,
) -> ServiceRegistration {
    ServiceRegistration::builder(name, phase)
        .initializer(ScriptedInitializer::new(name, log).on_init(script))
        .build()
}
