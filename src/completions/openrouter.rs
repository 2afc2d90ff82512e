//! OpenRouter chat-completions client.
//!
//! Speaks the OpenAI-compatible `/chat/completions` wire format, so any
//! compatible endpoint can stand in via
//! [`OpenRouterCompletions::with_base_url`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{
    Completion, CompletionClient, CompletionRequest, DEFAULT_FREQUENCY_PENALTY,
    DEFAULT_MAX_TOKENS, DEFAULT_PRESENCE_PENALTY, DEFAULT_TEMPERATURE, DEFAULT_TOP_P, Usage,
};
use crate::types::ServiceError;

/// Completion model used for all content generation.
pub const DEFAULT_COMPLETION_MODEL: &str = "moonshotai/kimi-k2-0905";

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct VendorErrorBody {
    error: Option<VendorErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct VendorErrorDetail {
    message: Option<String>,
}

/// Remote chat-completion client. Construct once at startup and share; all
/// fields are immutable after construction.
#[derive(Debug, Clone)]
pub struct OpenRouterCompletions {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenRouterCompletions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at an OpenAI-compatible endpoint, e.g. a mock server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

fn vendor_error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<VendorErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .and_then(|detail| detail.message)
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                format!("{status}: {body}")
            }
        })
}

#[async_trait]
impl CompletionClient for OpenRouterCompletions {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ServiceError> {
        let parameters = &request.parameters;
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": request.system_prompt},
                    {"role": "user", "content": request.user_message},
                ],
                "temperature": parameters.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                "max_tokens": parameters.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                "top_p": parameters.top_p.unwrap_or(DEFAULT_TOP_P),
                "frequency_penalty": parameters
                    .frequency_penalty
                    .unwrap_or(DEFAULT_FREQUENCY_PENALTY),
                "presence_penalty": parameters
                    .presence_penalty
                    .unwrap_or(DEFAULT_PRESENCE_PENALTY),
            }))
            .send()
            .await
            .map_err(|err| ServiceError::upstream("completions", err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::upstream(
                "completions",
                vendor_error_message(status, &body),
            ));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|err| ServiceError::upstream("completions", err.to_string()))?;

        let content = payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ServiceError::upstream("completions", "response contained no choices"))?;

        Ok(Completion {
            content,
            usage: payload.usage,
        })
    }
}
