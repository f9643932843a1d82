//! Core types for the orchestrator
//!
//! Defines:
//! - Boot attempt identifiers
//! - Orchestrator configuration and how it is read from a provider

use crate::error::OrchestratorError;
use phasegate_config::{ConfigProvider, ConfigProviderExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use ulid::Ulid;

/// Unique boot attempt identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BootId(pub Ulid);

impl BootId {
    /// Generate new boot ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for BootId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BootId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default per-service initializer timeout
pub const DEFAULT_SERVICE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default wait for a single dependency
pub const DEFAULT_DEPENDENCY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default readiness timeout
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(30);

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound for each teardown hook during shutdown
    pub shutdown_timeout: Duration,
    /// Capacity of the broadcast channel carrying state changes
    pub event_channel_capacity: usize,
    /// Run the services of one phase concurrently
    pub concurrent_phases: bool,
    /// Install the tracing observer on construction
    pub log_transitions: bool,
}

impl OrchestratorConfig {
    /// Environment keys read by [`OrchestratorConfig::from_provider`]
    pub const SHUTDOWN_TIMEOUT_KEY: &'static str = "BOOT_SHUTDOWN_TIMEOUT_SECS";
    pub const EVENT_CAPACITY_KEY: &'static str = "BOOT_EVENT_CHANNEL_CAPACITY";
    pub const CONCURRENT_PHASES_KEY: &'static str = "BOOT_CONCURRENT_PHASES";
    pub const LOG_TRANSITIONS_KEY: &'static str = "BOOT_LOG_TRANSITIONS";

    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from a provider, falling back to defaults for unset keys
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self, OrchestratorError> {
        let mut config = Self::default();

        if let Some(secs) = provider.get_parsed::<u64>(Self::SHUTDOWN_TIMEOUT_KEY)? {
            config.shutdown_timeout = Duration::from_secs(secs);
        }
        if let Some(capacity) = provider.get_parsed::<usize>(Self::EVENT_CAPACITY_KEY)? {
            config.event_channel_capacity = capacity.max(1);
        }
        if let Some(concurrent) = provider.get_bool(Self::CONCURRENT_PHASES_KEY)? {
            config.concurrent_phases = concurrent;
        }
        if let Some(log) = provider.get_bool(Self::LOG_TRANSITIONS_KEY)? {
            config.log_transitions = log;
        }

        Ok(config)
    }

    /// Set shutdown timeout
    #[inline]
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set event channel capacity
    #[inline]
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Attempt the services of a phase one at a time, in dependency order
    #[inline]
    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.concurrent_phases = false;
        self
    }

    /// Skip installing the tracing observer
    #[inline]
    #[must_use]
    pub fn without_transition_logging(mut self) -> Self {
        self.log_transitions = false;
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(10),
            event_channel_capacity: 256,
            concurrent_phases: true,
            log_transitions: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phasegate_config::MapProvider;

    #[test]
    fn defaults_when_unset() {
        let config = OrchestratorConfig::from_provider(&MapProvider::new()).unwrap();
        assert_eq!(config, OrchestratorConfig::default());
    }

    #[test]
    fn provider_overrides() {
        let p = MapProvider::new()
            .with("BOOT_SHUTDOWN_TIMEOUT_SECS", "3")
            .with("BOOT_EVENT_CHANNEL_CAPACITY", "0")
            .with("BOOT_CONCURRENT_PHASES", "off");
        let config = OrchestratorConfig::from_provider(&p).unwrap();
        assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
        assert_eq!(config.event_channel_capacity, 1);
        assert!(!config.concurrent_phases);
        assert!(config.log_transitions);
    }

    #[test]
    fn malformed_value_is_an_error() {
        let p = MapProvider::new().with("BOOT_SHUTDOWN_TIMEOUT_SECS", "soon");
        assert!(matches!(
            OrchestratorConfig::from_provider(&p),
            Err(OrchestratorError::Config(_))
        ));
    }

    #[test]
    fn boot_ids_are_unique() {
        assert_ne!(BootId::new(), BootId::new());
    }
}
