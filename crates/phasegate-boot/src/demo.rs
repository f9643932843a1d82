//! Simulated service graph: database, cache, auth, agent runtime and the
//! WebSocket gateway.
//!
//! Backends only sleep for a seeded latency and publish a connection handle
//! into the boot context; the auth node runs the real validator.

use anyhow::Context;
use async_trait::async_trait;
use phasegate_auth::{auth_service_registration, AuthConfigValidator, AuthPolicy, AUTH_SERVICE_NAME};
use phasegate_config::ConfigProvider;
use phasegate_core::{
    BootContext, InitializationPhase, LifecycleOrchestrator, ReadinessContract, ReadinessProbe,
    ServiceDependency, ServiceError, ServiceInitializer, ServiceRegistration,
    ServiceRegistrationBuilder,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const DATABASE: &str = "database";
pub const CACHE: &str = "cache";
pub const AGENT_RUNTIME: &str = "agent-runtime";
pub const GATEWAY: &str = "websocket-gateway";

/// Every demo service, in registration order
pub const DEMO_SERVICES: [&str; 5] = [DATABASE, CACHE, AUTH_SERVICE_NAME, AGENT_RUNTIME, GATEWAY];

const READINESS_DELAY: Duration = Duration::from_millis(250);

/// Knobs for one demo boot
#[derive(Debug, Clone)]
pub struct DemoOptions {
    /// Services whose initializer is forced to fail
    pub failing: BTreeSet<String>,
    /// Seed for simulated latencies
    pub seed: u64,
    pub policy: AuthPolicy,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            failing: BTreeSet::new(),
            seed: 42,
            policy: AuthPolicy::default(),
        }
    }
}

impl DemoOptions {
    #[must_use]
    pub fn failing(mut self, service: impl Into<String>) -> Self {
        self.failing.insert(service.into());
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: AuthPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    #[must_use]
    pub fn fails(&self, service: &str) -> bool {
        self.failing.contains(service)
    }
}

/// Handle a simulated backend publishes once connected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedConnection {
    pub service: String,
    pub latency: Duration,
}

/// Backend that connects after a fixed latency, or refuses when told to
#[derive(Debug)]
pub struct SimulatedBackend {
    name: String,
    latency: Duration,
    fail: bool,
}

impl SimulatedBackend {
    #[must_use]
    pub fn new(name: impl Into<String>, latency: Duration) -> Self {
        Self {
            name: name.into(),
            latency,
            fail: false,
        }
    }

    #[must_use]
    pub fn failing(mut self, fail: bool) -> Self {
        self.fail = fail;
        self
    }
}

#[async_trait]
impl ServiceInitializer for SimulatedBackend {
    async fn initialize(&self, ctx: &BootContext) -> Result<(), ServiceError> {
        tokio::time::sleep(self.latency).await;
        if self.fail {
            return Err(ServiceError::msg(format!(
                "{} refused connection (simulated)",
                self.name
            )));
        }

        ctx.insert_named(
            self.name.clone(),
            SimulatedConnection {
                service: self.name.clone(),
                latency: self.latency,
            },
        );
        tracing::debug!(service = %self.name, latency_ms = self.latency.as_millis(), "simulated backend connected");
        Ok(())
    }

    async fn shutdown(&self, _ctx: &BootContext) -> Result<(), ServiceError> {
        tracing::debug!(service = %self.name, "simulated backend closed");
        Ok(())
    }
}

/// Ready once the connection exists and `warmup` polls have passed
#[derive(Debug)]
pub struct WarmupProbe {
    service: String,
    warmup: u32,
    polls: AtomicU32,
}

impl WarmupProbe {
    #[must_use]
    pub fn new(service: impl Into<String>, warmup: u32) -> Self {
        Self {
            service: service.into(),
            warmup,
            polls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ReadinessProbe for WarmupProbe {
    async fn check(&self, ctx: &BootContext) -> Result<bool, ServiceError> {
        if ctx.get_named::<SimulatedConnection>(&self.service).is_none() {
            return Ok(false);
        }
        let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(polls > self.warmup)
    }
}

fn simulated(
    name: &str,
    phase: InitializationPhase,
    latency: Duration,
    options: &DemoOptions,
    warmup: u32,
) -> ServiceRegistrationBuilder {
    ServiceRegistration::builder(name, phase)
        .initializer(SimulatedBackend::new(name, latency).failing(options.fails(name)))
        .readiness(
            ReadinessContract::new(name, WarmupProbe::new(name, warmup))
                .with_retries(warmup + 2, READINESS_DELAY),
        )
}

/// Registrations for the demo graph, in registration order
pub fn demo_registrations(
    options: &DemoOptions,
    config: Arc<dyn ConfigProvider>,
) -> Vec<ServiceRegistration> {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut latency = move || Duration::from_millis(rng.random_range(20..120));

    let database = simulated(DATABASE, InitializationPhase::Database, latency(), options, 2)
        .critical(true)
        .build();

    let cache = simulated(CACHE, InitializationPhase::Cache, latency(), options, 0)
        .critical(false)
        .build();

    let mut auth = if options.fails(AUTH_SERVICE_NAME) {
        simulated(AUTH_SERVICE_NAME, InitializationPhase::Services, latency(), options, 0).build()
    } else {
        auth_service_registration(
            AuthConfigValidator::new(config).with_policy(options.policy.clone()),
        )
    };
    auth.dependencies.push(
        ServiceDependency::new(DATABASE).with_description("sessions are persisted in the database"),
    );

    let runtime = simulated(AGENT_RUNTIME, InitializationPhase::Services, latency(), options, 1)
        .depends_on(ServiceDependency::new(DATABASE))
        .depends_on(ServiceDependency::optional(CACHE).with_description("falls back to uncached reads"))
        .requires(AUTH_SERVICE_NAME)
        .build();

    let gateway = simulated(GATEWAY, InitializationPhase::Integration, latency(), options, 0)
        .requires(AGENT_RUNTIME)
        .requires(AUTH_SERVICE_NAME)
        .build();

    vec![database, cache, auth, runtime, gateway]
}

/// Orchestrator configured from `config` with the demo graph registered
pub fn build_orchestrator(
    config: Arc<dyn ConfigProvider>,
    options: &DemoOptions,
) -> anyhow::Result<LifecycleOrchestrator> {
    if let Some(unknown) = options
        .failing
        .iter()
        .find(|name| !DEMO_SERVICES.contains(&name.as_str()))
    {
        anyhow::bail!(
            "unknown service '{unknown}' (expected one of: {})",
            DEMO_SERVICES.join(", ")
        );
    }

    let orchestrator = LifecycleOrchestrator::from_provider(Arc::clone(&config))
        .context("invalid orchestrator configuration")?;

    for registration in demo_registrations(options, config) {
        let name = registration.name.clone();
        orchestrator
            .register_service(registration)
            .with_context(|| format!("failed to register '{name}'"))?;
    }

    Ok(orchestrator)
}
