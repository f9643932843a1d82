//! Boot and shutdown reports.

use crate::error::FailureReason;
use crate::types::BootId;
use chrono::{DateTime, Utc};
use phasegate_kernel::{InitializationPhase, ServiceState};
use serde::Serialize;

/// Final state of one service after a boot attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceOutcome {
    pub name: String,
    pub phase: InitializationPhase,
    pub state: ServiceState,
    pub is_critical: bool,
    /// Time from leaving `Pending` to the terminal state
    pub duration_ms: Option<u64>,
    /// Readiness probe evaluations, zero without a contract
    pub readiness_attempts: u32,
    pub failure: Option<FailureReason>,
    /// Non-critical dependencies that were not satisfied
    pub degraded_dependencies: Vec<String>,
}

impl ServiceOutcome {
    pub(crate) fn pending(name: &str, phase: InitializationPhase, is_critical: bool) -> Self {
        Self {
            name: name.to_string(),
            phase,
            state: ServiceState::Pending,
            is_critical,
            duration_ms: None,
            readiness_attempts: 0,
            failure: None,
            degraded_dependencies: Vec::new(),
        }
    }
}

/// How a phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    /// Every service reached a terminal state and no critical service failed
    Completed,
    /// A critical service failed in this phase
    Aborted,
    /// Not attempted because an earlier phase aborted
    Skipped,
    /// No services registered
    Empty,
}

/// Summary of one phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseOutcome {
    pub phase: InitializationPhase,
    pub status: PhaseStatus,
    /// Services in attempt order
    pub services: Vec<String>,
    pub duration_ms: u64,
}

/// Result of `initialize_all`
#[derive(Debug, Clone, Serialize)]
pub struct StartupReport {
    pub boot_id: BootId,
    pub started_at: DateTime<Utc>,
    /// No critical service failed
    pub success: bool,
    pub duration_ms: u64,
    /// Phase whose critical failure stopped the boot
    pub aborted_in: Option<InitializationPhase>,
    /// First critical service that failed
    pub critical_failure: Option<String>,
    /// One entry per phase, in boot order
    pub phases: Vec<PhaseOutcome>,
    /// One entry per registered service, in registration order
    pub services: Vec<ServiceOutcome>,
}

impl StartupReport {
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ServiceOutcome> {
        self.services.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn state_of(&self, name: &str) -> Option<ServiceState> {
        self.service(name).map(|s| s.state)
    }

    #[must_use]
    pub fn failed_services(&self) -> Vec<&str> {
        self.names_in(ServiceState::Failed)
    }

    #[must_use]
    pub fn ready_services(&self) -> Vec<&str> {
        self.names_in(ServiceState::Ready)
    }

    /// Services never attempted because the boot aborted
    #[must_use]
    pub fn pending_services(&self) -> Vec<&str> {
        self.names_in(ServiceState::Pending)
    }

    /// Boot succeeded but some non-critical service failed or ran degraded
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.success
            && self.services.iter().any(|s| {
                s.state == ServiceState::Failed || !s.degraded_dependencies.is_empty()
            })
    }

    fn names_in(&self, state: ServiceState) -> Vec<&str> {
        self.services
            .iter()
            .filter(|s| s.state == state)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Human-readable multi-line summary
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut text = String::new();

        let verdict = match (self.success, self.is_degraded()) {
            (false, _) => "FAILED",
            (true, true) => "DEGRADED",
            (true, false) => "OK",
        };
        text.push_str(&format!(
            "Boot {} {} in {}ms ({} ready, {} failed, {} pending)\n",
            self.boot_id,
            verdict,
            self.duration_ms,
            self.ready_services().len(),
            self.failed_services().len(),
            self.pending_services().len()
        ));

        if let (Some(phase), Some(service)) = (self.aborted_in, &self.critical_failure) {
            text.push_str(&format!(
                "Aborted in phase {phase}: critical service '{service}' failed\n"
            ));
        }

        for phase in &self.phases {
            if phase.status == PhaseStatus::Empty {
                continue;
            }
            text.push_str(&format!(
                "\n[{}] {:?} ({}ms)\n",
                phase.phase, phase.status, phase.duration_ms
            ));
            for name in &phase.services {
                let Some(service) = self.service(name) else {
                    continue;
                };
                text.push_str(&format!("  {:<24} {}", service.name, service.state));
                if !service.is_critical {
                    text.push_str(" (non-critical)");
                }
                if let Some(reason) = &service.failure {
                    text.push_str(&format!(": {reason}"));
                }
                if !service.degraded_dependencies.is_empty() {
                    text.push_str(&format!(
                        " [degraded: {}]",
                        service.degraded_dependencies.join(", ")
                    ));
                }
                text.push('\n');
            }
        }

        text
    }
}

/// Teardown hook that did not complete cleanly
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownFailure {
    pub service: String,
    pub message: String,
}

/// Result of `shutdown`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// Services whose teardown hook succeeded, in teardown order
    pub stopped: Vec<String>,
    pub failures: Vec<TeardownFailure>,
    pub duration_ms: u64,
    /// Shutdown had already run; nothing was torn down this time
    pub already_shut_down: bool,
}

impl ShutdownReport {
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
