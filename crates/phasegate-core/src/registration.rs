//! Service registrations: what a service needs and how to start and stop it.

use crate::context::BootContext;
use crate::error::ServiceError;
use crate::readiness::ReadinessContract;
use crate::types::{DEFAULT_DEPENDENCY_TIMEOUT, DEFAULT_SERVICE_TIMEOUT};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use phasegate_kernel::{InitializationPhase, ServiceState};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Requirement that another service reach a state before this one starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDependency {
    pub service_name: String,
    /// Minimum state the dependency must reach; `Ready` unless relaxed
    pub required_state: ServiceState,
    /// When false, an unsatisfied dependency is logged and the dependent proceeds
    pub is_critical: bool,
    /// Maximum wait for the dependency
    pub timeout: Duration,
    pub description: String,
}

impl ServiceDependency {
    /// Critical dependency on `service_name` reaching `Ready`
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            required_state: ServiceState::Ready,
            is_critical: true,
            timeout: DEFAULT_DEPENDENCY_TIMEOUT,
            description: String::new(),
        }
    }

    /// Non-critical dependency
    pub fn optional(service_name: impl Into<String>) -> Self {
        Self {
            is_critical: false,
            ..Self::new(service_name)
        }
    }

    #[must_use]
    pub fn requiring(mut self, state: ServiceState) -> Self {
        self.required_state = state;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Start and stop hooks for one service
#[async_trait]
pub trait ServiceInitializer: Send + Sync {
    /// Bring the service up. Bounded by the registration timeout.
    async fn initialize(&self, ctx: &BootContext) -> Result<(), ServiceError>;

    /// Release what `initialize` acquired. Called only after a successful
    /// `initialize`, in reverse completion order.
    async fn shutdown(&self, _ctx: &BootContext) -> Result<(), ServiceError> {
        Ok(())
    }
}

type HookFn = dyn Fn(BootContext) -> BoxFuture<'static, Result<(), ServiceError>> + Send + Sync;

fn hook<F, Fut>(f: F) -> Box<HookFn>
where
    F: Fn(BootContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
{
    Box::new(move |ctx| f(ctx).boxed())
}

/// Initializer built from async closures
pub struct FnInitializer {
    init: Box<HookFn>,
    teardown: Option<Box<HookFn>>,
}

impl FnInitializer {
    pub fn new<F, Fut>(init: F) -> Self
    where
        F: Fn(BootContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        Self {
            init: hook(init),
            teardown: None,
        }
    }

    #[must_use]
    pub fn with_teardown<F, Fut>(mut self, teardown: F) -> Self
    where
        F: Fn(BootContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        self.teardown = Some(hook(teardown));
        self
    }
}

#[async_trait]
impl ServiceInitializer for FnInitializer {
    async fn initialize(&self, ctx: &BootContext) -> Result<(), ServiceError> {
        (self.init)(ctx.clone()).await
    }

    async fn shutdown(&self, ctx: &BootContext) -> Result<(), ServiceError> {
        match &self.teardown {
            Some(teardown) => teardown(ctx.clone()).await,
            None => Ok(()),
        }
    }
}

/// Initializer that does nothing; for services that only gate on readiness
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInitializer;

#[async_trait]
impl ServiceInitializer for NoopInitializer {
    async fn initialize(&self, _ctx: &BootContext) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Immutable description of one service. Build with [`ServiceRegistration::builder`].
#[derive(Clone)]
pub struct ServiceRegistration {
    pub name: String,
    pub phase: InitializationPhase,
    pub dependencies: Vec<ServiceDependency>,
    pub initializer: Arc<dyn ServiceInitializer>,
    pub readiness: Option<ReadinessContract>,
    /// A critical failure aborts the whole boot
    pub is_critical: bool,
    /// Upper bound for the initializer
    pub timeout: Duration,
}

impl ServiceRegistration {
    pub fn builder(name: impl Into<String>, phase: InitializationPhase) -> ServiceRegistrationBuilder {
        ServiceRegistrationBuilder {
            name: name.into(),
            phase,
            dependencies: Vec::new(),
            initializer: None,
            readiness: None,
            is_critical: true,
            timeout: DEFAULT_SERVICE_TIMEOUT,
        }
    }

    /// Names of all declared dependencies, in declaration order
    #[must_use]
    pub fn dependency_names(&self) -> Vec<&str> {
        self.dependencies
            .iter()
            .map(|d| d.service_name.as_str())
            .collect()
    }
}

impl fmt::Debug for ServiceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistration")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("dependencies", &self.dependencies)
            .field("readiness", &self.readiness)
            .field("is_critical", &self.is_critical)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ServiceRegistration`]
pub struct ServiceRegistrationBuilder {
    name: String,
    phase: InitializationPhase,
    dependencies: Vec<ServiceDependency>,
    initializer: Option<Arc<dyn ServiceInitializer>>,
    readiness: Option<ReadinessContract>,
    is_critical: bool,
    timeout: Duration,
}

impl ServiceRegistrationBuilder {
    /// Add a dependency declaration
    #[must_use]
    pub fn depends_on(mut self, dependency: ServiceDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Shorthand for a critical dependency on `Ready`
    #[must_use]
    pub fn requires(self, service_name: impl Into<String>) -> Self {
        self.depends_on(ServiceDependency::new(service_name))
    }

    #[must_use]
    pub fn initializer(mut self, initializer: impl ServiceInitializer + 'static) -> Self {
        self.initializer = Some(Arc::new(initializer));
        self
    }

    #[must_use]
    pub fn shared_initializer(mut self, initializer: Arc<dyn ServiceInitializer>) -> Self {
        self.initializer = Some(initializer);
        self
    }

    /// Initializer from an async closure, without teardown
    #[must_use]
    pub fn initialize_with<F, Fut>(self, f: F) -> Self
    where
        F: Fn(BootContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        self.initializer(FnInitializer::new(f))
    }

    /// Attach a readiness contract. Its service name is forced to this registration's name.
    #[must_use]
    pub fn readiness(mut self, mut contract: ReadinessContract) -> Self {
        contract.service_name.clone_from(&self.name);
        self.readiness = Some(contract);
        self
    }

    #[must_use]
    pub fn critical(mut self, is_critical: bool) -> Self {
        self.is_critical = is_critical;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Finish; a registration without an initializer gets [`NoopInitializer`]
    #[must_use]
    pub fn build(self) -> ServiceRegistration {
        ServiceRegistration {
            name: self.name,
            phase: self.phase,
            dependencies: self.dependencies,
            initializer: self
                .initializer
                .unwrap_or_else(|| Arc::new(NoopInitializer)),
            readiness: self.readiness,
            is_critical: self.is_critical,
            timeout: self.timeout,
        }
    }
}
