//! Per-session conversation state
//!
//! A [`Session`] is owned by exactly one session runtime task, so nothing
//! here is synchronized. Writes are not validated.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Conversation state for one connected client
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    /// User inputs, oldest first
    pub past_inputs: Vec<String>,
    /// Assistant replies, oldest first
    pub generated_outputs: Vec<String>,
    /// Most recently submitted input that has not been consumed yet
    pub pending_input: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            past_inputs: Vec::new(),
            generated_outputs: Vec::new(),
            pending_input: String::new(),
            created_at: now,
            last_active: now,
        }
    }

    /// Stage a submitted value. The only writer of `pending_input`.
    pub fn stage_input(&mut self, value: impl Into<String>) {
        self.pending_input = value.into();
        self.last_active = Utc::now();
    }

    /// Consume the staged input, leaving `pending_input` empty
    pub fn take_pending(&mut self) -> Option<String> {
        if self.pending_input.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending_input))
        }
    }

    /// Record the user side of a new turn
    pub fn begin_turn(&mut self, input: String) {
        self.past_inputs.push(input);
    }

    /// Record the assistant side of the open turn
    pub fn complete_turn(&mut self, output: String) {
        self.generated_outputs.push(output);
        self.last_active = Utc::now();
    }

    /// Drop the unpaired input of a failed turn and return it.
    ///
    /// Returns `None` when the sequences are already the same length.
    pub fn rollback_turn(&mut self) -> Option<String> {
        if self.past_inputs.len() > self.generated_outputs.len() {
            self.past_inputs.pop()
        } else {
            None
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.past_inputs.len() == self.generated_outputs.len()
    }

    /// Number of completed turns
    pub fn turn_count(&self) -> usize {
        self.past_inputs.len().min(self.generated_outputs.len())
    }

    /// History in display order: newest turn first, assistant above user
    pub fn bubbles_newest_first(&self) -> Vec<Bubble> {
        let mut bubbles = Vec::with_capacity(self.turn_count() * 2);
        for i in (0..self.turn_count()).rev() {
            bubbles.push(Bubble {
                key: i.to_string(),
                origin: Origin::Assistant,
                text: self.generated_outputs[i].clone(),
            });
            bubbles.push(Bubble {
                key: format!("{i}_user"),
                origin: Origin::User,
                text: self.past_inputs[i].clone(),
            });
        }
        bubbles
    }
}

/// Who a rendered message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    User,
    Assistant,
}

/// One rendered chat bubble
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bubble {
    pub key: String,
    pub origin: Origin,
    pub text: String,
}
