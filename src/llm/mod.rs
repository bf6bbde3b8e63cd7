pub mod providers;
pub mod refine;
pub mod retry;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chat-completion provider types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LlmProvider {
    OpenAi,
    LmStudio,
}

/// Chat message for the completion API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A single chat-completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

/// Chat-completion response
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
}

/// Errors from a single chat-completion attempt.
///
/// The retry wrapper needs to tell timeouts apart from API rejections, so
/// these are structured rather than flattened into anyhow messages.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("response contained no choices")]
    EmptyResponse,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl LlmError {
    pub fn is_timeout(&self) -> bool {
        match self {
            LlmError::Timeout(_) => true,
            LlmError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Trait for chat-completion backends
#[async_trait]
pub trait Llm: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<LlmResponse, LlmError>;
    fn provider_type(&self) -> LlmProvider;
}

/// Create a chat-completion client based on configuration
pub fn create_llm(config: &crate::config::LlmConfig) -> Result<Box<dyn Llm>> {
    match config.provider {
        LlmProvider::OpenAi => Ok(Box::new(providers::OpenAiClient::new(config)?)),
        LlmProvider::LmStudio => Ok(Box::new(providers::LmStudioClient::new(config)?)),
    }
}
