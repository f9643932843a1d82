use phasegate_kernel::state_machine::{allowed_transitions, validate_transition};
use phasegate_kernel::types::ServiceState;
use phasegate_kernel::StateMachineError;
use proptest::prelude::*;

#[test]
fn test_pending_transitions() {
    assert!(validate_transition(ServiceState::Pending, ServiceState::Initializing).is_ok());
    assert!(validate_transition(ServiceState::Pending, ServiceState::Failed).is_ok());

    // Cannot skip initialization
    assert!(validate_transition(ServiceState::Pending, ServiceState::Ready).is_err());
}

#[test]
fn test_failed_is_sticky() {
    for to in [
        ServiceState::Pending,
        ServiceState::Initializing,
        ServiceState::Ready,
    ] {
        assert_eq!(
            validate_transition(ServiceState::Failed, to),
            Err(StateMachineError::IllegalTransition {
                from: ServiceState::Failed,
                to
            })
        );
    }
}

#[test]
fn test_ready_is_terminal() {
    assert!(allowed_transitions(ServiceState::Ready).is_empty());
    assert!(ServiceState::Ready.is_terminal());
}

fn any_state() -> impl Strategy<Value = ServiceState> {
    prop_oneof![
        Just(ServiceState::Pending),
        Just(ServiceState::Initializing),
        Just(ServiceState::Ready),
        Just(ServiceState::Failed),
    ]
}

proptest! {
    #[test]
    fn prop_all_transitions_are_subset_of_allowed(from in any_state(), to in any_state()) {
        let res = validate_transition(from, to);
        let allowed = allowed_transitions(from);

        if res.is_ok() {
            prop_assert!(allowed.contains(&to));
        } else {
            prop_assert!(!allowed.contains(&to));
        }
    }

    #[test]
    fn prop_terminal_states_have_no_exit(from in any_state()) {
        prop_assert_eq!(from.is_terminal(), allowed_transitions(from).is_empty());
    }
}
