//! Error types for phasegate core
//!
//! Provides error handling for:
//! - Service registration (duplicates, cycles, invalid declarations)
//! - Orchestrator misuse
//! - Failures reported by initializers and readiness probes
//! - The reason a service ended in `Failed`

use phasegate_config::ConfigError;
use phasegate_kernel::{GraphError, InitializationPhase, ServiceState};
use serde::Serialize;

/// Errors raised by `register_service`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// A service with this name is already registered
    #[error("service already registered: {0}")]
    DuplicateService(String),

    /// Adding the service would close a dependency cycle
    #[error("cyclic dependency: {}", path.join(" -> "))]
    CyclicDependency {
        /// Cycle path, first and last entries equal
        path: Vec<String>,
    },

    /// A dependency declaration can never be satisfied
    #[error("invalid dependency {dependency} for {service}: {reason}")]
    InvalidDependency {
        service: String,
        dependency: String,
        reason: String,
    },

    /// The registration itself is malformed
    #[error("invalid registration for '{service}': {reason}")]
    InvalidRegistration { service: String, reason: String },

    /// Initialization has already begun
    #[error("registration closed: initialization already started")]
    RegistrationClosed,
}

impl RegistrationError {
    pub(crate) fn invalid(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRegistration {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Check if error was caused by the dependency graph shape
    #[inline]
    #[must_use]
    pub fn is_graph_error(&self) -> bool {
        matches!(self, Self::CyclicDependency { .. } | Self::DuplicateService(_))
    }
}

impl From<GraphError> for RegistrationError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::DuplicateNode(name) => Self::DuplicateService(name),
            GraphError::CycleDetected { path } => Self::CyclicDependency { path },
            GraphError::NodeNotFound(name) => Self::InvalidRegistration {
                service: name,
                reason: "unknown service".to_string(),
            },
            GraphError::UnknownPhase(phase) => Self::InvalidRegistration {
                service: String::new(),
                reason: format!("unknown phase: {phase}"),
            },
        }
    }
}

/// Orchestrator-level errors
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// `initialize_all` was called more than once
    #[error("initialization already started")]
    AlreadyStarted,

    /// `shutdown` ran before `initialize_all`
    #[error("orchestrator has been shut down")]
    ShutDown,

    /// Dependency graph is inconsistent
    #[error("dependency graph error: {0}")]
    Graph(#[from] GraphError),

    /// Orchestrator configuration could not be read
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Failure returned by an initializer, teardown hook or readiness probe
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Plain failure message
    #[error("{0}")]
    Message(String),

    /// The hook panicked; the payload is rendered as text
    #[error("panicked: {0}")]
    Panicked(String),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    /// Create failure from a message
    #[inline]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Wrap an arbitrary error
    #[inline]
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(anyhow::Error::new(err))
    }

    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        Self::Panicked(panic_message(payload))
    }
}

/// Render a panic payload as text
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Why a service ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// A critical dependency never reached its required state
    #[error(
        "dependency {dependency} not {required} (observed {observed}{})",
        if *timed_out { ", timed out" } else { "" }
    )]
    DependencyUnsatisfied {
        dependency: String,
        required: ServiceState,
        observed: ServiceState,
        timed_out: bool,
    },

    /// A critical dependency names a service that was never registered
    #[error("dependency {dependency} is not registered")]
    DependencyUnknown { dependency: String },

    /// A critical dependency lives in a later phase and cannot be ready in time
    #[error("dependency {dependency} starts in later phase {phase}")]
    DependencyUnreachable {
        dependency: String,
        phase: InitializationPhase,
    },

    /// The initializer returned an error or panicked
    #[error("initializer failed: {message}")]
    InitializerFailed { message: String },

    /// The initializer did not finish within the service timeout
    #[error("initializer timed out after {timeout_ms}ms")]
    InitializerTimedOut { timeout_ms: u64 },

    /// The readiness probe never reported ready within its retry budget
    #[error("readiness not reached after {attempts} attempt(s){}", last_error.as_ref().map(|e| format!(": {e}")).unwrap_or_default())]
    ReadinessExhausted {
        attempts: u32,
        last_error: Option<String>,
    },

    /// The readiness check as a whole exceeded its timeout
    #[error("readiness timed out after {timeout_ms}ms")]
    ReadinessTimedOut { timeout_ms: u64 },
}

impl FailureReason {
    /// Check if failure was caused by a dependency rather than the service itself
    #[inline]
    #[must_use]
    pub fn is_dependency_failure(&self) -> bool {
        matches!(
            self,
            Self::DependencyUnsatisfied { .. }
                | Self::DependencyUnknown { .. }
                | Self::DependencyUnreachable { .. }
        )
    }

    /// Check if failure was a timeout
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::InitializerTimedOut { .. }
                | Self::ReadinessTimedOut { .. }
                | Self::DependencyUnsatisfied { timed_out: true, .. }
        )
    }
}

/// Observer callback failure; logged and swallowed by the event bus
#[derive(Debug, Clone, thiserror::Error)]
#[error("observer failed: {0}")]
pub struct ObserverError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_path() {
        let err = RegistrationError::from(GraphError::CycleDetected {
            path: vec!["a".into(), "b".into(), "a".into()],
        });
        assert_eq!(err.to_string(), "cyclic dependency: a -> b -> a");
        assert!(err.is_graph_error());
    }

    #[test]
    fn failure_reason_messages() {
        let reason = FailureReason::DependencyUnsatisfied {
            dependency: "db".into(),
            required: ServiceState::Ready,
            observed: ServiceState::Pending,
            timed_out: true,
        };
        assert_eq!(reason.to_string(), "dependency db not ready (observed pending, timed out)");
        assert!(reason.is_timeout());
        assert!(reason.is_dependency_failure());

        let reason = FailureReason::ReadinessExhausted {
            attempts: 3,
            last_error: Some("refused".into()),
        };
        assert_eq!(reason.to_string(), "readiness not reached after 3 attempt(s): refused");
        assert!(!reason.is_timeout());
    }

    #[test]
    fn panic_payloads_render() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(ServiceError::from_panic(payload.as_ref()).to_string(), "panicked: boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
