//! Properties of the app cell state table

use appcell_bus::MessageBus;
use appcell_core::{app_states, AppState, ParamsStatus, Stage, ALL_STATES};
use appcell_fsm::{StartMode, StateKey, StateMachine};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use proptest::sample::select;

fn machine() -> StateMachine<AppState> {
    let bus = MessageBus::new().make_channel_bus(None, "state tests");
    StateMachine::new(app_states(), AppState::New, bus).expect("state table is consistent")
}

fn any_state() -> impl Strategy<Value = AppState> {
    select(ALL_STATES.to_vec())
}

#[test]
fn every_state_is_defined_once() {
    let fsm = machine();
    assert_eq!(fsm.definitions().count(), ALL_STATES.len());
    for state in ALL_STATES {
        assert!(fsm.definition(&state).is_some(), "{state} missing");
    }
}

#[test]
fn fatal_error_is_terminal() {
    let fsm = machine();
    let fatal = fsm.definition(&AppState::FatalError).expect("fatal-error defined");
    assert!(fatal.next.is_empty());
}

#[test]
fn happy_path_is_allowed() {
    let mut fsm = machine();
    fsm.start(AppState::New, StartMode::Fresh).unwrap();
    for state in [
        AppState::Editing(ParamsStatus::Incomplete),
        AppState::Editing(ParamsStatus::Complete),
        AppState::Processing(Stage::Launching),
        AppState::Processing(Stage::Queued),
        AppState::Processing(Stage::Running),
        AppState::Success,
        AppState::Editing(ParamsStatus::Complete),
    ] {
        fsm.new_state(state).unwrap_or_else(|e| panic!("{state}: {e}"));
    }
}

proptest! {
    #[test]
    fn transition_succeeds_iff_listed(from in any_state(), to in any_state()) {
        let mut fsm = machine();
        fsm.start(from, StartMode::Fresh).unwrap();
        let allowed = fsm.definition(&from).unwrap().next.contains(&to);

        let outcome = fsm.new_state(to).map(|_| ());

        prop_assert_eq!(outcome.is_ok(), allowed);
        let expected = if allowed { to } else { from };
        prop_assert_eq!(*fsm.current_state().unwrap(), expected);
    }

    #[test]
    fn tags_resolve_to_their_state(state in any_state()) {
        let fsm = machine();
        prop_assert_eq!(fsm.resolve(&state.tag()).unwrap(), state);
    }
}
