//! Pure state transition function

use super::{Effect, Event, TurnState};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Assistant is still replying, wait for the current answer")]
    Busy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs, with no I/O.
pub fn transition(state: &TurnState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Submissions
        // ============================================================

        // An empty submit is not a query
        (TurnState::Idle | TurnState::Error { .. }, Event::Submit { text }) if text.is_empty() => {
            Ok(TransitionResult::new(state.clone()))
        }

        // Idle/Error + Submit -> AwaitingReply
        (TurnState::Idle | TurnState::Error { .. }, Event::Submit { text }) => {
            Ok(TransitionResult::new(TurnState::AwaitingReply)
                .with_effect(Effect::StageInput { text })
                .with_effect(Effect::BeginTurn)
                .with_effect(Effect::RequestCompletion)
                .with_effect(Effect::NotifyStateChange))
        }

        // At most one completion in flight per session
        (TurnState::AwaitingReply, Event::Submit { .. }) => Err(TransitionError::Busy),

        // ============================================================
        // Replies
        // ============================================================
        (TurnState::AwaitingReply, Event::ReplyReceived { text, usage }) => {
            Ok(TransitionResult::new(TurnState::Idle)
                .with_effect(Effect::CompleteTurn { text, usage })
                .with_effect(Effect::NotifyStateChange))
        }

        (TurnState::AwaitingReply, Event::ReplyFailed { error }) => {
            let kind = error.kind;
            Ok(TransitionResult::new(TurnState::Error {
                message: error.message.clone(),
                kind,
                retryable: kind.is_retryable(),
            })
            .with_effect(Effect::RollbackTurn {
                message: error.message,
                kind,
            })
            .with_effect(Effect::NotifyStateChange))
        }

        // A reply with no request outstanding
        (TurnState::Idle | TurnState::Error { .. }, event) => {
            Err(TransitionError::InvalidTransition(format!(
                "{} while {}",
                event.name(),
                state.name()
            )))
        }
    }
}
