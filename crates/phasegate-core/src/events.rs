//! State change notifications.
//!
//! Every transition is delivered synchronously to registered
//! [`StateObserver`]s and then fanned out on a broadcast channel. A failing
//! or panicking observer is logged and never disturbs the boot sequence.

use crate::error::{panic_message, ObserverError};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use phasegate_kernel::{InitializationPhase, ServiceState};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::broadcast;

/// One service state transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateChange {
    pub service: String,
    pub phase: InitializationPhase,
    pub old_state: ServiceState,
    pub new_state: ServiceState,
    pub at: DateTime<Utc>,
    /// Failure description, set for transitions into `Failed`
    pub reason: Option<String>,
}

/// Synchronous transition callback
pub trait StateObserver: Send + Sync {
    fn on_state_change(&self, change: &StateChange) -> Result<(), ObserverError>;

    /// Name used when logging observer failures
    fn name(&self) -> &str {
        "observer"
    }
}

/// Observer wrapping a plain `(name, old, new)` callback
pub struct CallbackObserver<F> {
    callback: F,
}

impl<F> CallbackObserver<F>
where
    F: Fn(&str, ServiceState, ServiceState) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> StateObserver for CallbackObserver<F>
where
    F: Fn(&str, ServiceState, ServiceState) + Send + Sync,
{
    fn on_state_change(&self, change: &StateChange) -> Result<(), ObserverError> {
        (self.callback)(&change.service, change.old_state, change.new_state);
        Ok(())
    }

    fn name(&self) -> &str {
        "callback"
    }
}

/// Logs every transition through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl StateObserver for TracingObserver {
    fn on_state_change(&self, change: &StateChange) -> Result<(), ObserverError> {
        match change.new_state {
            ServiceState::Failed => tracing::error!(
                service = %change.service,
                phase = %change.phase,
                from = %change.old_state,
                reason = change.reason.as_deref().unwrap_or("unspecified"),
                "service failed"
            ),
            ServiceState::Ready => tracing::info!(
                service = %change.service,
                phase = %change.phase,
                "service ready"
            ),
            _ => tracing::debug!(
                service = %change.service,
                phase = %change.phase,
                from = %change.old_state,
                to = %change.new_state,
                "service state changed"
            ),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

/// Observer registry plus broadcast fan-out
pub struct EventBus {
    observers: RwLock<Vec<Arc<dyn StateObserver>>>,
    sender: broadcast::Sender<StateChange>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            observers: RwLock::new(Vec::new()),
            sender,
        }
    }

    pub fn add_observer(&self, observer: Arc<dyn StateObserver>) {
        self.observers.write().push(observer);
    }

    /// Receiver for all changes published from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Deliver to every observer in registration order, then broadcast
    pub fn publish(&self, change: &StateChange) {
        // Snapshot so observers may register further observers
        let observers: Vec<_> = self.observers.read().iter().cloned().collect();

        for observer in observers {
            match catch_unwind(AssertUnwindSafe(|| observer.on_state_change(change))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(
                    observer = observer.name(),
                    service = %change.service,
                    error = %e,
                    "state observer returned an error"
                ),
                Err(payload) => tracing::error!(
                    observer = observer.name(),
                    service = %change.service,
                    panic = %panic_message(payload.as_ref()),
                    "state observer panicked"
                ),
            }
        }

        // No receivers is not an error
        let _ = self.sender.send(change.clone());
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observer_count())
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}
