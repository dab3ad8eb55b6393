//! Session turn state

use crate::llm::LlmErrorKind;
use serde::Serialize;

/// Where a session is in its request/reply cycle
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnState {
    /// Ready for input
    #[default]
    Idle,

    /// One completion request is in flight
    AwaitingReply,

    /// The last turn failed and was rolled back; new input is accepted
    Error {
        message: String,
        kind: LlmErrorKind,
        retryable: bool,
    },
}

impl TurnState {
    pub fn is_awaiting_reply(&self) -> bool {
        matches!(self, TurnState::AwaitingReply)
    }

    /// Short name used in logs and SSE payloads
    pub fn name(&self) -> &'static str {
        match self {
            TurnState::Idle => "idle",
            TurnState::AwaitingReply => "awaiting_reply",
            TurnState::Error { .. } => "error",
        }
    }
}
