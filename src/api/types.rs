//! API request and response types

use crate::runtime::SessionSnapshot;
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Response for session creation
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub session: SessionSnapshot,
}

/// Response with a session snapshot
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: SessionSnapshot,
}

/// Response for chat action
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// False when the submitted text was empty and nothing was sent
    pub queued: bool,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Completion backend settings
#[derive(Debug, Serialize)]
pub struct ModelResponse {
    pub model: String,
    pub temperature: f32,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
