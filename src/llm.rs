//! LLM provider abstraction
//!
//! A single chat-completion backend sits behind [`LlmService`] so the
//! runtime can be driven by mocks in tests.

mod config;
mod error;
mod openai;
mod types;

pub use config::{LlmConfig, DEFAULT_TEMPERATURE};
pub use error::{LlmError, LlmErrorKind};
pub use openai::OpenAIService;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for completion providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Send the transcript and return the single assistant reply
    async fn complete(&self, transcript: &[Message]) -> Result<Completion, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, transcript: &[Message]) -> Result<Completion, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(transcript).await;
        let duration = start.elapsed();

        match &result {
            Ok(completion) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    messages = transcript.len(),
                    input_tokens = completion.usage.input_tokens,
                    output_tokens = completion.usage.output_tokens,
                    "LLM request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    kind = %e.kind,
                    error = %e.message,
                    "LLM request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Build the production service from configuration, wrapped for logging
pub fn build_service(config: &LlmConfig) -> Result<Arc<dyn LlmService>, LlmError> {
    let service = OpenAIService::new(config)?;
    Ok(Arc::new(LoggingService::new(Arc::new(service))))
}
