use super::{ChatMessage, ChatRequest, Llm, LlmError, LlmProvider, LlmResponse};
use crate::config::LlmConfig;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenAI-style chat-completion request body, shared by both providers
/// (LM Studio speaks the same wire format).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    total_tokens: u32,
}

const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

async fn post_chat_completion(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: Option<&str>,
    request: ChatRequest,
) -> Result<LlmResponse, LlmError> {
    let body = ChatCompletionRequest {
        model: &request.model,
        messages: &request.messages,
        temperature: request.temperature,
    };

    let mut builder = client.post(endpoint).json(&body);
    if let Some(key) = api_key {
        builder = builder.header("Authorization", format!("Bearer {}", key));
    }

    let response = builder.send().await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Api { status, body });
    }

    let completion: ChatCompletionResponse = response.json().await?;

    let content = completion
        .choices
        .first()
        .map(|c| c.message.content.clone())
        .ok_or(LlmError::EmptyResponse)?;

    Ok(LlmResponse {
        content,
        tokens_used: completion.usage.map(|u| u.total_tokens),
    })
}

/// Hosted OpenAI API client
pub struct OpenAiClient {
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("OpenAI API key required (set OPENAI_API_KEY)"))?;

        // Attempt timeouts are enforced by the retry wrapper; the client
        // itself only bounds connection establishment.
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_seconds))
            .build()?;

        Ok(Self { api_key, client })
    }
}

#[async_trait]
impl Llm for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> Result<LlmResponse, LlmError> {
        debug!("Sending chat request to OpenAI, model {}", request.model);
        post_chat_completion(
            &self.client,
            OPENAI_CHAT_COMPLETIONS_URL,
            Some(&self.api_key),
            request,
        )
        .await
    }

    fn provider_type(&self) -> LlmProvider {
        LlmProvider::OpenAi
    }
}

/// Local LM Studio (or any OpenAI-compatible) endpoint client
pub struct LmStudioClient {
    endpoint: String,
    client: reqwest::Client,
}

impl LmStudioClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| anyhow!("LM Studio endpoint not configured"))?;

        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_seconds))
            .build()?;

        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl Llm for LmStudioClient {
    async fn chat(&self, request: ChatRequest) -> Result<LlmResponse, LlmError> {
        debug!("Sending chat request to {}", self.endpoint);
        post_chat_completion(&self.client, &self.endpoint, None, request).await
    }

    fn provider_type(&self) -> LlmProvider {
        LlmProvider::LmStudio
    }
}
