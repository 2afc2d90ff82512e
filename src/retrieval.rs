//! Retrieval service: the composition of embedding generation and vector
//! search.
//!
//! Ingestion path: chunk texts fan out to concurrent embedding calls, join,
//! and land in the store through one bulk insert. Query path: embed the query
//! text, then let the store rank by similarity.

use std::sync::Arc;

use futures_util::future::try_join_all;
use tracing::{debug, info};

use crate::embeddings::EmbeddingProvider;
use crate::stores::{EmbeddingRecord, RetrievalResult, VectorStore};
use crate::types::ServiceError;

/// Minimum similarity a stored vector must reach to be returned.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.5;

/// Maximum number of results per search.
pub const DEFAULT_MATCH_COUNT: usize = 10;

/// Embedding client plus vector store, wired once at startup.
///
/// Cheap to clone; both collaborators sit behind `Arc`s and are never
/// mutated after construction.
#[derive(Clone)]
pub struct RetrievalService {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl RetrievalService {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Returns the stored chunks most similar to `query_text`, ordered by
    /// similarity descending and filtered to `similarity >= threshold`.
    ///
    /// The query embedding is computed fresh on every call; errors from
    /// either stage pass through unchanged.
    pub async fn search(
        &self,
        query_text: &str,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<RetrievalResult>, ServiceError> {
        let embedding = self.embedder.embed(query_text).await?;
        let results = self.store.query(&embedding, threshold, limit).await?;
        debug!(
            model = self.embedder.model_id(),
            threshold,
            limit,
            hits = results.len(),
            "similarity search complete"
        );
        Ok(results)
    }

    /// Embeds every chunk concurrently, then persists all records in a
    /// single bulk insert. The first embedding failure aborts the whole
    /// operation before anything is written.
    ///
    /// Returns the number of chunks stored.
    pub async fn store_document(
        &self,
        content_id: &str,
        chunks: Vec<String>,
        metadata: serde_json::Value,
    ) -> Result<usize, ServiceError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let embeddings =
            try_join_all(chunks.iter().map(|chunk| self.embedder.embed(chunk))).await?;

        let records: Vec<EmbeddingRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| EmbeddingRecord {
                content_id: content_id.to_string(),
                text,
                embedding,
                metadata: metadata.clone(),
            })
            .collect();

        let stored = records.len();
        self.store.insert(records).await?;
        info!(content_id, chunks = stored, "stored document embeddings");
        Ok(stored)
    }
}
