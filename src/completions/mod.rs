//! Chat-completion dispatch.
//!
//! [`CompletionClient`] is the seam in front of the hosted LLM API. The
//! orchestrator assembles a system prompt and user message, hands them over
//! with [`GenerationParameters`], and gets back the completion text plus the
//! vendor's token usage.

pub mod openrouter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::ServiceError;

pub use openrouter::OpenRouterCompletions;

/// Sampling defaults applied wherever the caller leaves a parameter unset.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_TOP_P: f32 = 1.0;
pub const DEFAULT_FREQUENCY_PENALTY: f32 = 0.0;
pub const DEFAULT_PRESENCE_PENALTY: f32 = 0.0;

/// Caller-supplied sampling parameters; unset fields fall back to the
/// `DEFAULT_*` constants at dispatch time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationParameters {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
}

/// Token accounting reported by the vendor. Fields default to zero when the
/// vendor omits them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One two-message chat request: the assembled system prompt and the user's
/// query.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub parameters: GenerationParameters,
}

/// The completion text with usage metadata.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub usage: Usage,
}

/// Dispatches a single chat-completion request to a hosted LLM.
///
/// No retries and no streaming; a failed call surfaces as
/// [`ServiceError::Upstream`].
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ServiceError>;
}
