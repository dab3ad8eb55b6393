//! Transcript construction
//!
//! Turns a [`Session`] into the role-tagged message list sent to the model.

use crate::llm::Message;
use crate::session::Session;
use crate::system_prompt::system_prompt;

/// Build the transcript for a completion request.
///
/// The system prompt comes first, then user and assistant messages zipped
/// pairwise in chronological order. An index missing on one side is skipped
/// for that side only, so a trailing unanswered input is still sent.
pub fn build_transcript(session: &Session) -> Vec<Message> {
    let turns = session
        .past_inputs
        .len()
        .max(session.generated_outputs.len());

    let mut messages = Vec::with_capacity(1 + turns * 2);
    messages.push(Message::system(system_prompt()));

    for i in 0..turns {
        if let Some(input) = session.past_inputs.get(i) {
            messages.push(Message::user(input.as_str()));
        }
        if let Some(output) = session.generated_outputs.get(i) {
            messages.push(Message::assistant(output.as_str()));
        }
    }

    messages
}
