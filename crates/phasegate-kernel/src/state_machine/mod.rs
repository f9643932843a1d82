use crate::error::StateMachineError;
use crate::types::ServiceState;

/// Validates a service state transition.
///
/// `Failed` is reachable from `Pending` so that a service whose critical
/// dependency never became ready can be failed without being started.
pub fn validate_transition(from: ServiceState, to: ServiceState) -> Result<(), StateMachineError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: ServiceState) -> Vec<ServiceState> {
    use ServiceState::*;
    match from {
        Pending => vec![Initializing, Failed],
        Initializing => vec![Ready, Failed],
        Ready => vec![],
        Failed => vec![],
    }
}

fn allowed(from: ServiceState, to: ServiceState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
