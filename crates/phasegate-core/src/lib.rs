//! phasegate core - service lifecycle orchestration
//!
//! Boots an application's services in a fixed phase order:
//! - Services register with a phase, dependencies, an initializer and an
//!   optional readiness contract
//! - Dependency cycles are rejected at registration time
//! - Each service waits for its dependencies, initializes, then polls readiness
//! - A critical failure aborts the boot; non-critical failures are reported
//! - Every state transition reaches observers and a broadcast channel
//! - Shutdown tears services down in reverse initialization order
//!
//! # Example
//!
//! ```rust,ignore
//! use phasegate_core::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = LifecycleOrchestrator::new(
//!     OrchestratorConfig::new(),
//!     Arc::new(ProcessEnvProvider::new()),
//! );
//!
//! orchestrator.register_service(
//!     ServiceRegistration::builder("database", InitializationPhase::Database)
//!         .initialize_with(|_ctx| async { Ok(()) })
//!         .build(),
//! )?;
//!
//! let report = orchestrator.initialize_all().await?;
//! println!("{}", report.generate_text());
//! orchestrator.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod context;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod readiness;
pub mod registration;
pub mod report;
pub mod types;

pub use context::BootContext;
pub use error::{FailureReason, ObserverError, OrchestratorError, RegistrationError, ServiceError};
pub use events::{CallbackObserver, EventBus, StateChange, StateObserver, TracingObserver};
pub use orchestrator::LifecycleOrchestrator;
pub use readiness::{FnProbe, ReadinessContract, ReadinessProbe};
pub use registration::{
    FnInitializer, NoopInitializer, ServiceDependency, ServiceInitializer, ServiceRegistration,
    ServiceRegistrationBuilder,
};
pub use report::{
    PhaseOutcome, PhaseStatus, ServiceOutcome, ShutdownReport, StartupReport, TeardownFailure,
};
pub use types::{BootId, OrchestratorConfig};

pub use phasegate_kernel::{BackoffPolicy, InitializationPhase, ServiceState};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for registering and booting services
    pub use crate::{
        BackoffPolicy, BootContext, InitializationPhase, LifecycleOrchestrator,
        OrchestratorConfig, ReadinessContract, ServiceDependency, ServiceError,
        ServiceInitializer, ServiceRegistration, ServiceState, StartupReport,
    };
    pub use phasegate_config::{ConfigProvider, MapProvider, ProcessEnvProvider};
    pub use std::sync::Arc;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
