//! Kernel error types.

use crate::types::ServiceState;

/// Dependency graph errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Node already present
    #[error("service already in graph: {0}")]
    DuplicateNode(String),

    /// Node not present
    #[error("service not in graph: {0}")]
    NodeNotFound(String),

    /// Adding the edges would close a cycle
    #[error("cyclic dependency: {}", path.join(" -> "))]
    CycleDetected {
        /// Services participating in the cycle, first repeated at the end
        path: Vec<String>,
    },

    /// Phase name not recognised
    #[error("unknown initialization phase: {0}")]
    UnknownPhase(String),
}

/// State transition errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// Transition not in the allowed table
    #[error("illegal state transition: {from} -> {to}")]
    IllegalTransition {
        /// Current state
        from: ServiceState,
        /// Requested state
        to: ServiceState,
    },
}
