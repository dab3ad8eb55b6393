//! `OpenAI` chat-completions provider implementation

use super::config::{LlmConfig, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use super::types::{Completion, Message, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat-completions client with fixed model and temperature
pub struct OpenAIService {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl OpenAIService {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
        })
    }

    fn translate_request(transcript: &[Message]) -> OpenAIRequest<'_> {
        OpenAIRequest {
            model: DEFAULT_MODEL,
            messages: transcript
                .iter()
                .map(|m| OpenAIMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: DEFAULT_TEMPERATURE,
            stream: false,
        }
    }

    fn normalize_response(resp: OpenAIResponse) -> Result<Completion, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No choices in response"))?;

        let text = choice
            .message
            .content
            .ok_or_else(|| LlmError::unknown("Reply has no text content"))?;

        let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
            input_tokens: u64::from(u.prompt_tokens),
            output_tokens: u64::from(u.completion_tokens),
        });

        Ok(Completion { text, usage })
    }
}

#[async_trait]
impl LlmService for OpenAIService {
    async fn complete(&self, transcript: &[Message]) -> Result<Completion, LlmError> {
        let request = Self::translate_request(transcript);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<OpenAIErrorResponse>(&body) {
                return Err(LlmError::from_status(
                    status.as_u16(),
                    &error_resp.error.message,
                ));
            }
            tracing::warn!(status = status.as_u16(), body = %body, "Unrecognized error body");
            return Err(LlmError::from_status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("no details"),
            ));
        }

        let parsed: OpenAIResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(error = %e, body = %body, "Unparseable completion response");
            LlmError::unknown("Failed to parse response from the model provider")
        })?;

        Self::normalize_response(parsed)
    }

    fn model_id(&self) -> &str {
        DEFAULT_MODEL
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIReplyMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}
