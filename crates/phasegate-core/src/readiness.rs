//! Readiness contracts: a probe plus the retry discipline used to poll it.

use crate::context::BootContext;
use crate::error::ServiceError;
use crate::types::DEFAULT_READINESS_TIMEOUT;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use phasegate_kernel::BackoffPolicy;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Readiness predicate evaluated after a successful initializer.
///
/// `Ok(false)` and `Err(_)` both count as a failed attempt.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn check(&self, ctx: &BootContext) -> Result<bool, ServiceError>;
}

type ProbeFn = dyn Fn(BootContext) -> BoxFuture<'static, Result<bool, ServiceError>> + Send + Sync;

/// Probe built from an async closure
pub struct FnProbe {
    check: Box<ProbeFn>,
}

impl FnProbe {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(BootContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, ServiceError>> + Send + 'static,
    {
        Self {
            check: Box::new(move |ctx| f(ctx).boxed()),
        }
    }
}

#[async_trait]
impl ReadinessProbe for FnProbe {
    async fn check(&self, ctx: &BootContext) -> Result<bool, ServiceError> {
        (self.check)(ctx.clone()).await
    }
}

/// Probe paired with a timeout and retry budget.
///
/// The timeout bounds the whole polling loop, retries included.
#[derive(Clone)]
pub struct ReadinessContract {
    pub service_name: String,
    pub probe: Arc<dyn ReadinessProbe>,
    pub timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl ReadinessContract {
    /// Contract with the default timeout and retry budget
    pub fn new(service_name: impl Into<String>, probe: impl ReadinessProbe + 'static) -> Self {
        Self {
            service_name: service_name.into(),
            probe: Arc::new(probe),
            timeout: DEFAULT_READINESS_TIMEOUT,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Contract around an async closure
    pub fn from_fn<F, Fut>(service_name: impl Into<String>, f: F) -> Self
    where
        F: Fn(BootContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, ServiceError>> + Send + 'static,
    {
        Self::new(service_name, FnProbe::new(f))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fixed delay between attempts
    #[must_use]
    pub fn with_retries(mut self, retry_count: u32, retry_delay: Duration) -> Self {
        self.backoff = BackoffPolicy::fixed(retry_count, retry_delay);
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    #[inline]
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.backoff.max_retries
    }

    #[inline]
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.backoff.delay
    }
}

impl fmt::Debug for ReadinessContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessContract")
            .field("service_name", &self.service_name)
            .field("timeout", &self.timeout)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}
