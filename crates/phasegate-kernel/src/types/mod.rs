//! Core lifecycle types: service states and boot phases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a registered service within one boot attempt.
///
/// `Ready` and `Failed` are terminal. `Failed` is sticky: nothing moves a
/// failed service back to `Pending` during the same attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// Registered, not yet attempted
    Pending,
    /// Initializer or readiness polling in progress
    Initializing,
    /// Initialized and readiness contract satisfied
    Ready,
    /// Initialization, readiness or dependency resolution failed
    Failed,
}

impl ServiceState {
    /// Whether no further transition is possible.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }

    /// Position along the success path; `Failed` has none.
    fn progress(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Initializing => Some(1),
            Self::Ready => Some(2),
            Self::Failed => None,
        }
    }

    /// Whether a service in this state meets a dependency requiring `required`.
    ///
    /// A dependency on `Initializing` is met once the service has started,
    /// a dependency on `Ready` only once it is ready. `Failed` meets nothing.
    #[must_use]
    pub fn satisfies(self, required: ServiceState) -> bool {
        match (self.progress(), required.progress()) {
            (Some(have), Some(need)) => have >= need,
            _ => false,
        }
    }

    /// Whether this state can still progress to meet `required`.
    #[must_use]
    pub fn can_still_satisfy(self, required: ServiceState) -> bool {
        !matches!(self, Self::Failed) && (self.satisfies(required) || !self.is_terminal())
    }

    /// Lowercase name used in logs and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed, globally ordered boot phases.
///
/// A service's phase decides when it is attempted. Phase N+1 never starts
/// before phase N has finished and cleared the fail-fast check.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum InitializationPhase {
    /// Process-level prerequisites (configuration, logging)
    Bootstrap,
    /// External dependencies and validators
    Dependencies,
    /// Database connections and migrations
    Database,
    /// Cache connections
    Cache,
    /// Application services (auth, agent runtime)
    Services,
    /// Outer integration surfaces (WebSocket gateway)
    Integration,
}

impl InitializationPhase {
    /// All phases in boot order.
    pub const ALL: [InitializationPhase; 6] = [
        Self::Bootstrap,
        Self::Dependencies,
        Self::Database,
        Self::Cache,
        Self::Services,
        Self::Integration,
    ];

    /// Zero-based position in the boot order.
    #[inline]
    #[must_use]
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Phase attempted after this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    /// Lowercase name used in logs and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::Dependencies => "dependencies",
            Self::Database => "database",
            Self::Cache => "cache",
            Self::Services => "services",
            Self::Integration => "integration",
        }
    }
}

impl fmt::Display for InitializationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InitializationPhase {
    type Err = crate::error::GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::error::GraphError::UnknownPhase(s.to_string()))
    }
}
