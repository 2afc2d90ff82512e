//! Content-generation orchestration.
//!
//! One call: retrieve context for the query, assemble the per-type system
//! prompt, dispatch a single chat completion, and return the generated text
//! with usage metadata. Any stage failure aborts the whole call; there is no
//! partial output and no retry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::completions::{
    Completion, CompletionClient, CompletionRequest, GenerationParameters, Usage,
};
use crate::retrieval::RetrievalService;
use crate::types::ServiceError;

/// Retrieval settings for orchestration are fixed by design; callers tune
/// only the generation parameters.
pub const ORCHESTRATION_MATCH_THRESHOLD: f32 = 0.5;
pub const ORCHESTRATION_MATCH_COUNT: usize = 5;

/// The kind of study content to generate. Each variant owns its prompt
/// template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Lesson,
    Test,
    Script,
    Notes,
}

impl ContentType {
    /// Builds the system prompt for this content type: the fixed persona
    /// template with the retrieved `context` interpolated, followed by any
    /// caller-supplied `supplement`.
    ///
    /// The supplement is appended, never substituted, so the template's
    /// instructions always take precedence.
    pub fn system_prompt(self, context: &str, supplement: Option<&str>) -> String {
        let supplement = supplement.unwrap_or("");
        let prompt = match self {
            Self::Lesson => format!(
                "You are an expert UPSC coach creating educational content.\n\
                 Create a comprehensive lesson on the topic below.\n\
                 Include clear explanations, examples, and key points to remember.\n\
                 Format the output with proper headings, subheadings, and bullet points.\n\
                 \n\
                 Context from relevant documents:\n\
                 {context}\n\
                 \n\
                 {supplement}"
            ),
            Self::Test => format!(
                "You are an expert UPSC exam setter.\n\
                 Create challenging questions based on the topic below.\n\
                 For prelims, create MCQs with 4 options each and mark the correct answer.\n\
                 For mains, create descriptive questions with expected answer points.\n\
                 \n\
                 Context from relevant documents:\n\
                 {context}\n\
                 \n\
                 {supplement}"
            ),
            Self::Script => format!(
                "You are an expert UPSC coach creating a podcast or video script.\n\
                 Write a conversational script that explains the topic clearly.\n\
                 Include questions a student might ask and provide detailed answers.\n\
                 Format as a dialogue with clear speaker designations.\n\
                 \n\
                 Context from relevant documents:\n\
                 {context}\n\
                 \n\
                 {supplement}"
            ),
            Self::Notes => format!(
                "You are an expert UPSC note maker.\n\
                 Create comprehensive notes on the topic below.\n\
                 Include key facts, concepts, theories, and important points.\n\
                 Format with clear headings, bullet points, and highlight important terms.\n\
                 Include proper citations for any specific claims or facts.\n\
                 \n\
                 Context from relevant documents:\n\
                 {context}\n\
                 \n\
                 {supplement}"
            ),
        };
        prompt.trim().to_string()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lesson => "lesson",
            Self::Test => "test",
            Self::Script => "script",
            Self::Notes => "notes",
        }
    }
}

/// One orchestration call, as received on the wire. `content_type` and
/// `query` are validated by [`Orchestrator::orchestrate`] rather than the
/// deserializer so missing fields surface as a uniform validation error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestrationRequest {
    #[serde(rename = "type")]
    pub content_type: Option<ContentType>,
    pub query: Option<String>,
    pub syllabus_node_id: Option<String>,
    pub system_prompt: Option<String>,
    pub parameters: GenerationParameters,
}

/// Result of an orchestration call.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationOutcome {
    pub result: String,
    pub usage: Usage,
    pub docs_count: usize,
}

/// Composes retrieval and completion into content generation.
#[derive(Clone)]
pub struct Orchestrator {
    retrieval: RetrievalService,
    completions: Arc<dyn CompletionClient>,
}

impl Orchestrator {
    pub fn new(retrieval: RetrievalService, completions: Arc<dyn CompletionClient>) -> Self {
        Self {
            retrieval,
            completions,
        }
    }

    pub async fn orchestrate(
        &self,
        request: OrchestrationRequest,
    ) -> Result<OrchestrationOutcome, ServiceError> {
        let query = request.query.as_deref().filter(|query| !query.is_empty());
        let (Some(content_type), Some(query)) = (request.content_type, query) else {
            return Err(ServiceError::validation("type and query are required"));
        };

        let docs = self
            .retrieval
            .search(query, ORCHESTRATION_MATCH_THRESHOLD, ORCHESTRATION_MATCH_COUNT)
            .await?;

        let context = docs
            .iter()
            .map(|doc| doc.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let system_prompt =
            content_type.system_prompt(&context, request.system_prompt.as_deref());

        let Completion { content, usage } = self
            .completions
            .complete(CompletionRequest {
                system_prompt,
                user_message: query.to_string(),
                parameters: request.parameters,
            })
            .await?;

        info!(
            content_type = content_type.as_str(),
            docs = docs.len(),
            total_tokens = usage.total_tokens,
            "orchestration complete"
        );

        Ok(OrchestrationOutcome {
            result: content,
            usage,
            docs_count: docs.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;
    use crate::stores::{EmbeddingRecord, RetrievalResult, VectorStore};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory store that ranks by true cosine similarity.
    #[derive(Default)]
    struct InMemoryStore {
        records: Mutex<Vec<EmbeddingRecord>>,
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
    }

    #[async_trait]
    impl VectorStore for InMemoryStore {
        async fn insert(&self, records: Vec<EmbeddingRecord>) -> Result<(), ServiceError> {
            self.records.lock().unwrap().extend(records);
            Ok(())
        }

        async fn query(
            &self,
            embedding: &[f32],
            threshold: f32,
            limit: usize,
        ) -> Result<Vec<RetrievalResult>, ServiceError> {
            let records = self.records.lock().unwrap();
            let mut hits: Vec<RetrievalResult> = records
                .iter()
                .enumerate()
                .map(|(idx, record)| RetrievalResult {
                    id: idx as i64,
                    content_id: record.content_id.clone(),
                    text: record.text.clone(),
                    metadata: record.metadata.clone(),
                    similarity: cosine(embedding, &record.embedding),
                })
                .filter(|hit| hit.similarity >= threshold)
                .collect();
            hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
            hits.truncate(limit);
            Ok(hits)
        }

        async fn count(&self) -> Result<usize, ServiceError> {
            Ok(self.records.lock().unwrap().len())
        }
    }

    /// Completion client that records the request and returns a canned reply.
    #[derive(Default)]
    struct CapturingCompletions {
        last_request: Mutex<Option<CompletionRequest>>,
    }

    #[async_trait]
    impl CompletionClient for CapturingCompletions {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<Completion, ServiceError> {
            *self.last_request.lock().unwrap() = Some(request);
            Ok(Completion {
                content: "generated lesson".to_string(),
                usage: Usage {
                    prompt_tokens: 42,
                    completion_tokens: 7,
                    total_tokens: 49,
                },
            })
        }
    }

    async fn orchestrator_with_document(
        text: &str,
    ) -> (Orchestrator, Arc<CapturingCompletions>) {
        let embedder = Arc::new(MockEmbeddingProvider::new());
        let store = Arc::new(InMemoryStore::default());
        let retrieval = RetrievalService::new(embedder, store);
        retrieval
            .store_document("content-1", vec![text.to_string()], serde_json::json!({}))
            .await
            .unwrap();

        let completions = Arc::new(CapturingCompletions::default());
        (
            Orchestrator::new(retrieval, completions.clone()),
            completions,
        )
    }

    #[tokio::test]
    async fn lesson_prompt_contains_retrieved_context() {
        let chunk = "The Indus Valley civilization flourished around 2500 BCE.";
        let (orchestrator, completions) = orchestrator_with_document(chunk).await;

        let outcome = orchestrator
            .orchestrate(OrchestrationRequest {
                content_type: Some(ContentType::Lesson),
                // The query matches the stored chunk exactly, so similarity
                // is ~1.0 and the chunk is guaranteed past the threshold.
                query: Some(chunk.to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(outcome.result, "generated lesson");
        assert_eq!(outcome.docs_count, 1);
        assert_eq!(outcome.usage.total_tokens, 49);

        let request = completions.last_request.lock().unwrap().take().unwrap();
        assert!(
            request.system_prompt.contains(chunk),
            "system prompt must embed the retrieved context"
        );
        assert!(request.system_prompt.starts_with("You are an expert UPSC coach"));
        assert_eq!(request.user_message, chunk);
    }

    #[tokio::test]
    async fn supplement_is_appended_after_the_template() {
        let chunk = "Monsoons drive the Indian agricultural calendar.";
        let (orchestrator, completions) = orchestrator_with_document(chunk).await;

        orchestrator
            .orchestrate(OrchestrationRequest {
                content_type: Some(ContentType::Notes),
                query: Some(chunk.to_string()),
                system_prompt: Some("Answer in Hindi.".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let request = completions.last_request.lock().unwrap().take().unwrap();
        let prompt = request.system_prompt;
        let context_at = prompt.find(chunk).expect("context missing");
        let supplement_at = prompt.find("Answer in Hindi.").expect("supplement missing");
        assert!(
            supplement_at > context_at,
            "supplement must follow the template and context"
        );
    }

    #[tokio::test]
    async fn missing_type_or_query_is_a_validation_error() {
        let (orchestrator, _) = orchestrator_with_document("anything").await;

        for request in [
            OrchestrationRequest::default(),
            OrchestrationRequest {
                content_type: Some(ContentType::Test),
                ..Default::default()
            },
            OrchestrationRequest {
                query: Some("a query".to_string()),
                ..Default::default()
            },
            OrchestrationRequest {
                content_type: Some(ContentType::Test),
                query: Some(String::new()),
                ..Default::default()
            },
        ] {
            assert!(matches!(
                orchestrator.orchestrate(request).await,
                Err(ServiceError::Validation(_))
            ));
        }
    }
}
