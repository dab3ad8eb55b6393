//! Events that can occur in a session

use crate::llm::{LlmError, Usage};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    /// The text field was submitted with this value
    Submit { text: String },

    // LLM events
    ReplyReceived { text: String, usage: Usage },
    ReplyFailed { error: LlmError },
}

impl Event {
    pub fn submit(text: impl Into<String>) -> Self {
        Event::Submit { text: text.into() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::Submit { .. } => "submit",
            Event::ReplyReceived { .. } => "reply_received",
            Event::ReplyFailed { .. } => "reply_failed",
        }
    }
}
