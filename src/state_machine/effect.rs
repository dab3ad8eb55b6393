//! Effects produced by state transitions

use crate::llm::{LlmErrorKind, Usage};

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Copy the submitted value into `pending_input`
    StageInput { text: String },

    /// Consume `pending_input` and append it to `past_inputs`
    BeginTurn,

    /// Build the transcript and dispatch a completion request
    RequestCompletion,

    /// Append the reply to `generated_outputs` and notify clients
    CompleteTurn { text: String, usage: Usage },

    /// Drop the unpaired input of the failed turn and notify clients
    RollbackTurn { message: String, kind: LlmErrorKind },

    /// Broadcast the new turn state
    NotifyStateChange,
}
