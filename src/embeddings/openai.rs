//! OpenAI-compatible embeddings client.
//!
//! One POST to `{base}/embeddings` per call, bearer-authenticated. Any
//! OpenAI-compatible endpoint works via [`OpenAiEmbeddings::with_base_url`],
//! which is also how tests point the client at a local mock server.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::EmbeddingProvider;
use crate::types::ServiceError;

/// Embedding model used for both ingestion and queries. Query and document
/// vectors must come from the same model for similarities to be meaningful.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct VendorErrorBody {
    error: Option<VendorErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct VendorErrorDetail {
    message: Option<String>,
}

/// Remote embedding client over the OpenAI embeddings API.
///
/// Stateless apart from the connection-pooling `reqwest::Client`; construct
/// once at startup and share.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiEmbeddings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
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

/// Pulls the vendor's error message out of a non-2xx body, falling back to
/// the raw body or the status line.
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
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "input": text,
                "encoding_format": "float",
            }))
            .send()
            .await
            .map_err(|err| ServiceError::upstream("embeddings", err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::upstream(
                "embeddings",
                vendor_error_message(status, &body),
            ));
        }

        let payload: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|err| ServiceError::upstream("embeddings", err.to_string()))?;

        payload
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| ServiceError::upstream("embeddings", "response contained no embeddings"))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
