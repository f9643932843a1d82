//! Lifecycle orchestrator
//!
//! Boots registered services phase by phase. Within a phase, services run
//! concurrently (or one at a time in dependency order when configured) and
//! wait on a shared state table for their dependencies. A critical failure
//! stops the boot: services not yet started stay `Pending` and later phases
//! are skipped.

use crate::context::BootContext;
use crate::error::{FailureReason, OrchestratorError, RegistrationError, ServiceError};
use crate::events::{CallbackObserver, EventBus, StateChange, StateObserver, TracingObserver};
use crate::registration::{ServiceDependency, ServiceRegistration};
use crate::report::{
    PhaseOutcome, PhaseStatus, ServiceOutcome, ShutdownReport, StartupReport, TeardownFailure,
};
use crate::types::{BootId, OrchestratorConfig};
use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use phasegate_config::ConfigProvider;
use phasegate_kernel::state_machine::validate_transition;
use phasegate_kernel::{DependencyGraph, InitializationPhase, ServiceState};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch};
use tokio::time::timeout;

#[derive(Default)]
struct Registry {
    /// Set once `initialize_all` starts; no registrations afterwards
    closed: bool,
    order: Vec<Arc<ServiceRegistration>>,
    by_name: HashMap<String, usize>,
}

#[derive(Default)]
struct Lifecycle {
    /// Services whose initializer succeeded, in completion order
    initialized: Vec<String>,
    critical_failure: Option<String>,
    /// Set by the first `shutdown`; later boots are refused
    shut_down: bool,
}

enum DependencyWait {
    Satisfied,
    /// Boot aborted while waiting; the dependent stays `Pending`
    Aborted,
    Unsatisfied(FailureReason),
}

/// Dependency-ordered service lifecycle orchestrator
pub struct LifecycleOrchestrator {
    config: OrchestratorConfig,
    context: BootContext,
    graph: DependencyGraph,
    registry: RwLock<Registry>,
    states: watch::Sender<HashMap<String, ServiceState>>,
    events: EventBus,
    aborted: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
}

impl LifecycleOrchestrator {
    /// Create orchestrator reading configuration through `provider`
    #[must_use]
    pub fn new(config: OrchestratorConfig, provider: Arc<dyn ConfigProvider>) -> Self {
        Self::with_context(config, BootContext::new(provider))
    }

    /// Create orchestrator around an existing context
    #[must_use]
    pub fn with_context(config: OrchestratorConfig, context: BootContext) -> Self {
        let (states, _) = watch::channel(HashMap::new());
        let events = EventBus::new(config.event_channel_capacity);
        if config.log_transitions {
            events.add_observer(Arc::new(TracingObserver));
        }

        Self {
            config,
            context,
            graph: DependencyGraph::new(),
            registry: RwLock::new(Registry::default()),
            states,
            events,
            aborted: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Create orchestrator with configuration read from `provider`
    pub fn from_provider(provider: Arc<dyn ConfigProvider>) -> Result<Self, OrchestratorError> {
        let config = OrchestratorConfig::from_provider(provider.as_ref())?;
        Ok(Self::new(config, provider))
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Context shared with every initializer and probe
    #[inline]
    #[must_use]
    pub fn context(&self) -> &BootContext {
        &self.context
    }

    #[inline]
    #[must_use]
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Register a service.
    ///
    /// Rejects duplicates, registrations that would close a dependency
    /// cycle (the graph is left unchanged), dependencies requiring `Failed`,
    /// and any registration after `initialize_all` has started.
    pub fn register_service(&self, registration: ServiceRegistration) -> Result<(), RegistrationError> {
        let name = registration.name.clone();
        validate_registration(&registration)?;

        let mut registry = self.registry.write();
        if registry.closed {
            return Err(RegistrationError::RegistrationClosed);
        }
        if registry.by_name.contains_key(&name) {
            return Err(RegistrationError::DuplicateService(name));
        }

        self.graph
            .add_service(&name, &registration.dependency_names())?;

        tracing::debug!(
            service = %name,
            phase = %registration.phase,
            dependencies = registration.dependencies.len(),
            critical = registration.is_critical,
            "service registered"
        );

        let index = registry.order.len();
        registry.order.push(Arc::new(registration));
        registry.by_name.insert(name.clone(), index);
        drop(registry);

        self.states.send_modify(|states| {
            states.insert(name, ServiceState::Pending);
        });
        Ok(())
    }

    /// Register a plain `(name, old, new)` transition callback
    pub fn add_state_change_callback<F>(&self, callback: F)
    where
        F: Fn(&str, ServiceState, ServiceState) + Send + Sync + 'static,
    {
        self.events
            .add_observer(Arc::new(CallbackObserver::new(callback)));
    }

    /// Register a transition observer; called synchronously, in order
    pub fn subscribe_observer(&self, observer: Arc<dyn StateObserver>) {
        self.events.add_observer(observer);
    }

    /// Broadcast receiver for transitions published from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.events.subscribe()
    }

    /// Current state, `None` for unregistered names
    #[must_use]
    pub fn service_state(&self, name: &str) -> Option<ServiceState> {
        self.states.borrow().get(name).copied()
    }

    #[must_use]
    pub fn is_ready(&self, name: &str) -> bool {
        self.service_state(name) == Some(ServiceState::Ready)
    }

    /// Snapshot of every service state
    #[must_use]
    pub fn states(&self) -> BTreeMap<String, ServiceState> {
        self.states
            .borrow()
            .iter()
            .map(|(name, state)| (name.clone(), *state))
            .collect()
    }

    /// Failed services in registration order
    #[must_use]
    pub fn failed_services(&self) -> Vec<String> {
        let states = self.states.borrow();
        self.registry
            .read()
            .order
            .iter()
            .filter(|r| states.get(&r.name) == Some(&ServiceState::Failed))
            .map(|r| r.name.clone())
            .collect()
    }

    #[must_use]
    pub fn phase_of(&self, name: &str) -> Option<InitializationPhase> {
        self.registration(name).map(|r| r.phase)
    }

    /// Registered names in registration order
    #[must_use]
    pub fn registered_services(&self) -> Vec<String> {
        self.registry
            .read()
            .order
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    #[must_use]
    pub fn registration(&self, name: &str) -> Option<Arc<ServiceRegistration>> {
        let registry = self.registry.read();
        registry
            .by_name
            .get(name)
            .map(|&i| Arc::clone(&registry.order[i]))
    }

    /// Whether a critical failure stopped the boot
    #[inline]
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Run every phase in order.
    ///
    /// Returns `Err` only when called more than once. Service failures,
    /// critical or not, are reported in the [`StartupReport`].
    pub async fn initialize_all(&self) -> Result<StartupReport, OrchestratorError> {
        let registrations = {
            let mut registry = self.registry.write();
            if registry.closed {
                return Err(OrchestratorError::AlreadyStarted);
            }
            if self.lifecycle.lock().shut_down {
                return Err(OrchestratorError::ShutDown);
            }
            registry.closed = true;
            registry.order.clone()
        };

        self.graph.validate()?;
        for missing in self.graph.unresolved() {
            tracing::warn!(dependency = %missing, "dependency names an unregistered service");
        }

        let boot_id = BootId::new();
        let started_at = Utc::now();
        let clock = Instant::now();
        tracing::info!(
            boot_id = %boot_id,
            services = registrations.len(),
            concurrent = self.config.concurrent_phases,
            "starting boot sequence"
        );

        let mut outcomes: HashMap<String, ServiceOutcome> = HashMap::new();
        let mut phases = Vec::with_capacity(InitializationPhase::ALL.len());
        let mut aborted_in = None;

        for phase in InitializationPhase::ALL {
            let members: Vec<&ServiceRegistration> = registrations
                .iter()
                .filter(|r| r.phase == phase)
                .map(AsRef::as_ref)
                .collect();
            let names: Vec<String> = members.iter().map(|r| r.name.clone()).collect();

            if members.is_empty() || aborted_in.is_some() {
                let status = if members.is_empty() {
                    PhaseStatus::Empty
                } else {
                    PhaseStatus::Skipped
                };
                phases.push(PhaseOutcome {
                    phase,
                    status,
                    services: names,
                    duration_ms: 0,
                });
                continue;
            }

            let order = self.graph.order_subset(&names)?;
            let ordered: Vec<&ServiceRegistration> = order
                .iter()
                .filter_map(|name| members.iter().copied().find(|r| &r.name == name))
                .collect();

            tracing::info!(phase = %phase, services = ordered.len(), "entering phase");
            let phase_clock = Instant::now();

            let results = if self.config.concurrent_phases {
                join_all(ordered.iter().map(|reg| self.boot_service(reg))).await
            } else {
                let mut results = Vec::with_capacity(ordered.len());
                for reg in &ordered {
                    results.push(self.boot_service(reg).await);
                }
                results
            };
            for outcome in results {
                outcomes.insert(outcome.name.clone(), outcome);
            }

            let status = if self.is_aborted() {
                aborted_in = Some(phase);
                tracing::error!(phase = %phase, "critical failure, aborting boot");
                PhaseStatus::Aborted
            } else {
                tracing::info!(phase = %phase, "phase complete");
                PhaseStatus::Completed
            };
            phases.push(PhaseOutcome {
                phase,
                status,
                services: order,
                duration_ms: millis(phase_clock.elapsed()),
            });
        }

        let services: Vec<ServiceOutcome> = registrations
            .iter()
            .map(|r| {
                outcomes
                    .remove(&r.name)
                    .unwrap_or_else(|| ServiceOutcome::pending(&r.name, r.phase, r.is_critical))
            })
            .collect();

        let report = StartupReport {
            boot_id,
            started_at,
            success: aborted_in.is_none(),
            duration_ms: millis(clock.elapsed()),
            aborted_in,
            critical_failure: self.lifecycle.lock().critical_failure.clone(),
            phases,
            services,
        };

        if report.success {
            tracing::info!(
                boot_id = %boot_id,
                ready = report.ready_services().len(),
                failed = report.failed_services().len(),
                duration_ms = report.duration_ms,
                "boot sequence complete"
            );
        } else {
            tracing::error!(
                boot_id = %boot_id,
                critical_failure = report.critical_failure.as_deref().unwrap_or("unknown"),
                "boot sequence aborted"
            );
        }

        Ok(report)
    }

    /// Tear down every successfully initialized service in reverse
    /// completion order. Failures are collected, never raised.
    ///
    /// Each service is torn down at most once. Services that finish
    /// initializing after an earlier call (a boot still in flight) are torn
    /// down by the next call.
    pub async fn shutdown(&self) -> ShutdownReport {
        let initialized = {
            let mut lifecycle = self.lifecycle.lock();
            let pending = std::mem::take(&mut lifecycle.initialized);
            let repeated = lifecycle.shut_down && pending.is_empty();
            lifecycle.shut_down = true;
            if repeated {
                return ShutdownReport {
                    already_shut_down: true,
                    ..ShutdownReport::default()
                };
            }
            pending
        };

        let clock = Instant::now();
        let mut report = ShutdownReport::default();
        tracing::info!(services = initialized.len(), "shutting down");

        for name in initialized.iter().rev() {
            let Some(registration) = self.registration(name) else {
                continue;
            };

            let result = timeout(
                self.config.shutdown_timeout,
                guarded(registration.initializer.shutdown(&self.context)),
            )
            .await;

            let message = match result {
                Ok(Ok(())) => {
                    tracing::debug!(service = %name, "service stopped");
                    report.stopped.push(name.clone());
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!(
                    "teardown timed out after {}ms",
                    millis(self.config.shutdown_timeout)
                ),
            };

            tracing::warn!(service = %name, error = %message, "teardown failed");
            report.failures.push(TeardownFailure {
                service: name.clone(),
                message,
            });
        }

        report.duration_ms = millis(clock.elapsed());
        tracing::info!(
            stopped = report.stopped.len(),
            failed = report.failures.len(),
            "shutdown complete"
        );
        report
    }

    async fn boot_service(&self, reg: &ServiceRegistration) -> ServiceOutcome {
        let mut outcome = ServiceOutcome::pending(&reg.name, reg.phase, reg.is_critical);
        if self.is_aborted() {
            return outcome;
        }
        let clock = Instant::now();

        for dependency in &reg.dependencies {
            match self.await_dependency(reg, dependency).await {
                DependencyWait::Satisfied => {}
                DependencyWait::Aborted => return outcome,
                DependencyWait::Unsatisfied(reason) if dependency.is_critical => {
                    return self.fail(reg, outcome, reason, clock);
                }
                DependencyWait::Unsatisfied(reason) => {
                    tracing::warn!(
                        service = %reg.name,
                        dependency = %dependency.service_name,
                        reason = %reason,
                        "optional dependency unsatisfied, continuing"
                    );
                    outcome
                        .degraded_dependencies
                        .push(dependency.service_name.clone());
                }
            }
        }

        // Cancelled before start
        if self.is_aborted() {
            return outcome;
        }

        self.transition(reg, ServiceState::Initializing, None);

        match timeout(reg.timeout, guarded(reg.initializer.initialize(&self.context))).await {
            Ok(Ok(())) => self.lifecycle.lock().initialized.push(reg.name.clone()),
            Ok(Err(e)) => {
                let reason = FailureReason::InitializerFailed {
                    message: e.to_string(),
                };
                return self.fail(reg, outcome, reason, clock);
            }
            Err(_) => {
                let reason = FailureReason::InitializerTimedOut {
                    timeout_ms: millis(reg.timeout),
                };
                return self.fail(reg, outcome, reason, clock);
            }
        }

        if let Some(contract) = &reg.readiness {
            let attempts = AtomicU32::new(0);
            let (probe, ctx, counter) = (&contract.probe, &self.context, &attempts);
            let poll = contract.backoff.poll_until(move |attempt| {
                counter.store(attempt, Ordering::SeqCst);
                guarded(probe.check(ctx))
            });

            match timeout(contract.timeout, poll).await {
                Ok(result) => {
                    outcome.readiness_attempts = result.attempts;
                    if !result.satisfied {
                        let reason = FailureReason::ReadinessExhausted {
                            attempts: result.attempts,
                            last_error: result.last_error.map(|e| e.to_string()),
                        };
                        return self.fail(reg, outcome, reason, clock);
                    }
                }
                Err(_) => {
                    outcome.readiness_attempts = attempts.load(Ordering::SeqCst);
                    let reason = FailureReason::ReadinessTimedOut {
                        timeout_ms: millis(contract.timeout),
                    };
                    return self.fail(reg, outcome, reason, clock);
                }
            }
        }

        self.transition(reg, ServiceState::Ready, None);
        outcome.state = ServiceState::Ready;
        outcome.duration_ms = Some(millis(clock.elapsed()));
        outcome
    }

    async fn await_dependency(
        &self,
        reg: &ServiceRegistration,
        dependency: &ServiceDependency,
    ) -> DependencyWait {
        let name = dependency.service_name.as_str();
        let required = dependency.required_state;

        let Some(target) = self.registration(name) else {
            return DependencyWait::Unsatisfied(FailureReason::DependencyUnknown {
                dependency: name.to_string(),
            });
        };
        if target.phase > reg.phase {
            return DependencyWait::Unsatisfied(FailureReason::DependencyUnreachable {
                dependency: name.to_string(),
                phase: target.phase,
            });
        }

        let mut rx = self.states.subscribe();
        let aborted = &self.aborted;
        let waited = timeout(
            dependency.timeout,
            rx.wait_for(|states| {
                aborted.load(Ordering::SeqCst) || settled(state_in(states, name), required)
            }),
        )
        .await
        .map(|changed| changed.is_ok());

        let observed = self.service_state(name).unwrap_or(ServiceState::Pending);
        if observed.satisfies(required) {
            return DependencyWait::Satisfied;
        }
        if self.is_aborted() {
            return DependencyWait::Aborted;
        }

        DependencyWait::Unsatisfied(FailureReason::DependencyUnsatisfied {
            dependency: name.to_string(),
            required,
            observed,
            timed_out: waited.is_err(),
        })
    }

    fn fail(
        &self,
        reg: &ServiceRegistration,
        mut outcome: ServiceOutcome,
        reason: FailureReason,
        clock: Instant,
    ) -> ServiceOutcome {
        // Abort before publishing so waiting dependents observe it and stay Pending
        if reg.is_critical {
            self.lifecycle
                .lock()
                .critical_failure
                .get_or_insert_with(|| reg.name.clone());
            self.aborted.store(true, Ordering::SeqCst);
        }

        self.transition(reg, ServiceState::Failed, Some(reason.to_string()));
        outcome.state = ServiceState::Failed;
        outcome.failure = Some(reason);
        outcome.duration_ms = Some(millis(clock.elapsed()));
        outcome
    }

    fn transition(&self, reg: &ServiceRegistration, to: ServiceState, reason: Option<String>) {
        let mut from = ServiceState::Pending;
        let mut rejected = None;

        self.states.send_if_modified(|states| {
            from = state_in(states, &reg.name);
            match validate_transition(from, to) {
                Ok(()) => {
                    states.insert(reg.name.clone(), to);
                    true
                }
                Err(e) => {
                    rejected = Some(e);
                    false
                }
            }
        });

        if let Some(e) = rejected {
            tracing::error!(service = %reg.name, error = %e, "state transition rejected");
            return;
        }

        self.events.publish(&StateChange {
            service: reg.name.clone(),
            phase: reg.phase,
            old_state: from,
            new_state: to,
            at: Utc::now(),
            reason,
        });
    }
}

impl std::fmt::Debug for LifecycleOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleOrchestrator")
            .field("config", &self.config)
            .field("services", &self.registry.read().order.len())
            .field("aborted", &self.is_aborted())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

fn validate_registration(registration: &ServiceRegistration) -> Result<(), RegistrationError> {
    let name = &registration.name;
    if name.trim().is_empty() || name.trim() != name {
        return Err(RegistrationError::invalid(
            name.as_str(),
            "name must be non-empty with no surrounding whitespace",
        ));
    }
    if registration.timeout.is_zero() {
        return Err(RegistrationError::invalid(name.as_str(), "timeout must be positive"));
    }
    if let Some(contract) = &registration.readiness {
        if contract.service_name != *name {
            return Err(RegistrationError::invalid(
                name.as_str(),
                format!("readiness contract names '{}'", contract.service_name),
            ));
        }
        if contract.timeout.is_zero() {
            return Err(RegistrationError::invalid(
                name.as_str(),
                "readiness timeout must be positive",
            ));
        }
    }
    for dependency in &registration.dependencies {
        if dependency.required_state == ServiceState::Failed {
            return Err(RegistrationError::InvalidDependency {
                service: name.clone(),
                dependency: dependency.service_name.clone(),
                reason: "required state 'failed' can never be met".to_string(),
            });
        }
    }
    Ok(())
}

fn state_in(states: &HashMap<String, ServiceState>, name: &str) -> ServiceState {
    states.get(name).copied().unwrap_or(ServiceState::Pending)
}

/// Dependency has either met the requirement or can no longer meet it
fn settled(state: ServiceState, required: ServiceState) -> bool {
    state.satisfies(required) || !state.can_still_satisfy(required)
}

/// Run a hook, converting a panic into a [`ServiceError`]
async fn guarded<T, F>(hook: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match AssertUnwindSafe(hook).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(ServiceError::from_panic(payload.as_ref())),
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
