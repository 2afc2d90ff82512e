//! Vector persistence for chunk embeddings.
//!
//! The [`VectorStore`] trait abstracts the backing database so the retrieval
//! service stays agnostic of which native vector extension does the ranking:
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │ VectorStore trait│
//!                  │ (insert / query) │
//!                  └────────┬─────────┘
//!                           │
//!                ┌──────────┴──────────┐
//!                ▼                     ▼
//!         ┌─────────────┐      ┌─────────────┐
//!         │   SQLite    │      │  (future)   │
//!         │ sqlite-vec  │      │  pgvector   │
//!         └─────────────┘      └─────────────┘
//! ```
//!
//! Similarity ranking is pushed into the database; this crate never scans
//! vectors itself.

pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::ServiceError;

pub use sqlite::SqliteVectorStore;

/// One chunk ready for persistence: the text, its embedding, and the opaque
/// caller metadata. The row id and creation timestamp are assigned by the
/// store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingRecord {
    pub content_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: serde_json::Value,
}

/// One ranked hit from a similarity query. Ephemeral; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResult {
    pub id: i64,
    pub content_id: String,
    pub text: String,
    pub metadata: serde_json::Value,
    /// Cosine similarity against the query vector, in `[0, 1]` for vectors
    /// pointing the same general direction.
    pub similarity: f32,
}

/// Persistence boundary for embedding records.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persist all records in one atomic bulk insert: either every record
    /// lands or none do.
    async fn insert(&self, records: Vec<EmbeddingRecord>) -> Result<(), ServiceError>;

    /// Nearest-neighbour query. Returns records with
    /// `similarity >= threshold`, ordered by similarity descending, at most
    /// `limit` rows. Tie order is whatever the backing store produces.
    async fn query(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<RetrievalResult>, ServiceError>;

    /// Total number of stored records.
    async fn count(&self) -> Result<usize, ServiceError>;
}
