//! phasegate kernel
//!
//! Leaf model shared by the orchestrator and its consumers:
//! - [`ServiceState`] and the legal transitions between states
//! - [`InitializationPhase`], the fixed global boot order
//! - [`DependencyGraph`], with whole-graph cycle detection at registration time
//! - [`BackoffPolicy`], the single retry discipline for polling predicates

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod backoff;
pub mod dag;
pub mod error;
pub mod state_machine;
pub mod types;

pub use backoff::{BackoffPolicy, PollOutcome};
pub use dag::DependencyGraph;
pub use error::{GraphError, StateMachineError};
pub use types::{InitializationPhase, ServiceState};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
