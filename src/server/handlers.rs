//! Request handlers for the three entry points.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::chunker::{self, DEFAULT_MAX_TOKENS};
use crate::orchestrator::OrchestrationRequest;
use crate::retrieval::{DEFAULT_MATCH_COUNT, DEFAULT_MATCH_THRESHOLD};
use crate::stores::RetrievalResult;
use crate::syllabus::SyllabusNode;
use crate::types::ServiceError;

/// Parses a JSON body, reporting malformed input as a validation error so the
/// response body stays `{"error": ...}` like every other failure.
fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| {
        ApiError::Service(ServiceError::validation(format!("invalid JSON body: {err}")))
    })
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct IngestRequest {
    content_id: Option<String>,
    text: Option<String>,
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    success: bool,
    chunks_count: usize,
}

/// `POST /ingest` — chunk a document and persist one embedding per chunk.
///
/// Accepts JSON only; multipart uploads are recognized but unimplemented
/// (501), anything else is 415.
pub async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    let content_type = content_type(&headers);

    if content_type.contains("multipart/form-data") {
        return Err(ApiError::NotImplemented("File upload not implemented yet"));
    }
    if !content_type.contains("application/json") {
        return Err(ApiError::UnsupportedMediaType);
    }

    let request: IngestRequest = parse_json(&body)?;
    let (Some(content_id), Some(text)) = (request.content_id, request.text) else {
        return Err(ServiceError::validation("contentId and text are required").into());
    };
    if content_id.is_empty() || text.is_empty() {
        return Err(ServiceError::validation("contentId and text are required").into());
    }

    let chunks = chunker::split_into_chunks(&text, DEFAULT_MAX_TOKENS);
    let chunks_count = state
        .retrieval
        .store_document(
            &content_id,
            chunks,
            request.metadata.unwrap_or_else(|| serde_json::json!({})),
        )
        .await?;

    Ok(Json(IngestResponse {
        success: true,
        chunks_count,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SearchRequest {
    query: Option<String>,
    match_threshold: Option<f32>,
    match_count: Option<usize>,
    syllabus_node_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyllabusContext {
    node: SyllabusNode,
    path: Vec<SyllabusNode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    results: Vec<RetrievalResult>,
    syllabus_context: Option<SyllabusContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    syllabus_error: Option<String>,
}

/// `POST /search` — semantic search, optionally annotated with the syllabus
/// node and its root-to-node path.
///
/// A missing syllabus node degrades to `syllabusContext: null` with the
/// message in `syllabusError`; it never fails the search itself.
pub async fn search(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SearchResponse>, ApiError> {
    let request: SearchRequest = parse_json(&body)?;
    let query = request
        .query
        .filter(|query| !query.is_empty())
        .ok_or_else(|| ServiceError::validation("query is required"))?;

    let results = state
        .retrieval
        .search(
            &query,
            request.match_threshold.unwrap_or(DEFAULT_MATCH_THRESHOLD),
            request.match_count.unwrap_or(DEFAULT_MATCH_COUNT),
        )
        .await?;

    let (syllabus_context, syllabus_error) = match request.syllabus_node_id {
        Some(node_id) => match load_syllabus_context(&state, &node_id).await {
            Ok(context) => (Some(context), None),
            Err(ServiceError::NotFound { .. }) => {
                tracing::warn!(%node_id, "syllabus node missing; returning null context");
                (None, Some(format!("syllabus node not found: {node_id}")))
            }
            Err(err) => return Err(err.into()),
        },
        None => (None, None),
    };

    Ok(Json(SearchResponse {
        results,
        syllabus_context,
        syllabus_error,
    }))
}

async fn load_syllabus_context(
    state: &AppState,
    node_id: &str,
) -> Result<SyllabusContext, ServiceError> {
    let node = state.syllabus.get_node(node_id).await?;
    let path = state.syllabus.get_path(node_id).await?;
    Ok(SyllabusContext { node, path })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrateContext {
    docs_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrateResponse {
    result: String,
    usage: crate::completions::Usage,
    context: OrchestrateContext,
}

/// `POST /orchestrate` — retrieval-augmented content generation.
pub async fn orchestrate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<OrchestrateResponse>, ApiError> {
    let request: OrchestrationRequest = parse_json(&body)?;
    let outcome = state.orchestrator.orchestrate(request).await?;

    Ok(Json(OrchestrateResponse {
        result: outcome.result,
        usage: outcome.usage,
        context: OrchestrateContext {
            docs_count: outcome.docs_count,
        },
    }))
}
