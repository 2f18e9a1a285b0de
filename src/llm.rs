//! LLM gateway: one stateless prompt-in, text-out call
//!
//! Every higher-level advisor builds its prompt and parses the answer on top of
//! [`LlmGateway::ask`]. Failures come back as a typed [`LlmError`]; the wizard decides
//! how to present them.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Fixed role description sent with every request
pub const SYSTEM_PROMPT: &str = "You are a helpful AI travel assistant. Flights come from real-time airline data. \
     Hotels are recommended based on user city and budget. Provide short, creative suggestions.";

pub const MAX_TOKENS: u32 = 700;
pub const TEMPERATURE: f32 = 0.7;

/// Failure of a single LLM round trip
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error("authentication rejected: {0}")]
    Authentication(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("service returned status {status}: {body}")]
    Service { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    /// Text shown in place of the model's answer when the call failed
    pub fn inline_notice(&self) -> String {
        format!("An error occurred while calling the language model: {}", self)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

/// Chat-completions request body
#[derive(Debug, Serialize, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Chat-completions response body
#[derive(Debug, Deserialize, Clone)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Choice {
    pub message: ChatMessage,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, LlmError>;
}

/// Transport for any OpenAI-compatible chat-completions endpoint
pub struct OpenAiTransport {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiTransport {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, LlmError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ChatTransport for OpenAiTransport {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let start_time = Instant::now();
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await?;
        let status = response.status();

        info!(
            status = %status,
            duration_ms = start_time.elapsed().as_millis(),
            "Chat completion request completed"
        );

        let body = response.text().await?;
        match status {
            s if s.is_success() => serde_json::from_str(&body)
                .map_err(|e| LlmError::MalformedResponse(format!("{}: {}", e, body))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(LlmError::Authentication(body)),
            StatusCode::TOO_MANY_REQUESTS => Err(LlmError::RateLimited(body)),
            s => Err(LlmError::Service {
                status: s.as_u16(),
                body,
            }),
        }
    }
}

/// The single "ask" operation every advisor builds on
#[derive(Clone)]
pub struct LlmGateway {
    transport: Arc<dyn ChatTransport>,
    model: String,
}

impl LlmGateway {
    pub fn new(transport: Arc<dyn ChatTransport>, model: &str) -> Self {
        Self {
            transport,
            model: model.to_string(),
        }
    }

    /// Build the request sent for `prompt`. No history is carried between calls.
    pub fn request_for(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }

    /// Send `prompt` and return the model's text
    #[instrument(level = "info", skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn ask(&self, prompt: &str) -> Result<String, LlmError> {
        let request = self.request_for(prompt);
        let response = match self.transport.chat(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "LLM call failed");
                return Err(e);
            }
        };

        match response.choices.into_iter().next() {
            Some(choice) => {
                debug!(answer_len = choice.message.content.len(), "LLM answered");
                Ok(choice.message.content)
            }
            None => {
                warn!("LLM returned no choices");
                Err(LlmError::MalformedResponse("response contained no choices".to_string()))
            }
        }
    }
}
