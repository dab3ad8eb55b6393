//! Property-based tests for the state machine
//!
//! Drives random event sequences through `transition` and applies the
//! resulting effects to a `Session` the same way the runtime does.

use super::*;
use crate::llm::{LlmError, LlmErrorKind, Usage};
use crate::session::Session;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

/// Apply session-mutating effects, ignoring I/O ones
fn apply(session: &mut Session, effects: Vec<Effect>) {
    for effect in effects {
        match effect {
            Effect::StageInput { text } => session.stage_input(text),
            Effect::BeginTurn => {
                if let Some(input) = session.take_pending() {
                    session.begin_turn(input);
                }
            }
            Effect::CompleteTurn { text, .. } => session.complete_turn(text),
            Effect::RollbackTurn { .. } => {
                session.rollback_turn();
            }
            Effect::RequestCompletion | Effect::NotifyStateChange => {}
        }
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_error_kind() -> impl Strategy<Value = LlmErrorKind> {
    prop_oneof![
        Just(LlmErrorKind::Network),
        Just(LlmErrorKind::RateLimit),
        Just(LlmErrorKind::ServerError),
        Just(LlmErrorKind::Auth),
        Just(LlmErrorKind::InvalidRequest),
        Just(LlmErrorKind::Unknown),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-zA-Z ?]{0,20}".prop_map(|text| Event::Submit { text }),
        "[a-zA-Z ]{1,30}".prop_map(|text| Event::ReplyReceived {
            text,
            usage: Usage::default(),
        }),
        (arb_error_kind(), "[a-z ]{1,20}").prop_map(|(kind, message)| Event::ReplyFailed {
            error: LlmError::new(kind, message),
        }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_parity_holds_outside_open_turn(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut state = TurnState::Idle;
        let mut session = Session::new("prop");

        for event in events {
            if let Ok(result) = transition(&state, event) {
                state = result.new_state;
                apply(&mut session, result.effects);
            }

            if state.is_awaiting_reply() {
                prop_assert_eq!(session.past_inputs.len(), session.generated_outputs.len() + 1);
            } else {
                prop_assert!(session.is_balanced());
            }
            // Staged input never survives the effect batch that staged it
            prop_assert_eq!(session.pending_input.as_str(), "");
        }
    }

    #[test]
    fn prop_rejected_events_change_nothing(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut state = TurnState::Idle;

        for event in events {
            let before = state.clone();
            match transition(&state, event) {
                Ok(result) => state = result.new_state,
                Err(_) => prop_assert_eq!(&state, &before),
            }
        }
    }

    #[test]
    fn prop_busy_only_while_awaiting(state_is_awaiting in any::<bool>(), text in "[a-z]{1,10}") {
        let state = if state_is_awaiting { TurnState::AwaitingReply } else { TurnState::Idle };
        let result = transition(&state, Event::Submit { text });
        prop_assert_eq!(
            matches!(result, Err(TransitionError::Busy)),
            state_is_awaiting
        );
    }
}
