//! Syllabus outline lookups.
//!
//! The syllabus is a forest: `subject` roots, each with `paper`, `topic`,
//! and `subtopic` descendants linked by `parent_id`. This module is
//! independent of retrieval; nodes are plain rows with no embeddings.

pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::ServiceError;

pub use sqlite::SqliteSyllabusStore;

/// Depth of a node in the outline. Closed set; stored as its lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyllabusLevel {
    Subject,
    Paper,
    Topic,
    Subtopic,
}

impl SyllabusLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Paper => "paper",
            Self::Topic => "topic",
            Self::Subtopic => "subtopic",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "subject" => Some(Self::Subject),
            "paper" => Some(Self::Paper),
            "topic" => Some(Self::Topic),
            "subtopic" => Some(Self::Subtopic),
            _ => None,
        }
    }
}

/// One entry in the curriculum outline.
///
/// Invariant: every `parent_id` chain terminates at a node with
/// `parent_id = None`. Cycles are a data-integrity violation the store's
/// writer is expected to prevent; [`SyllabusStore::get_path`] does not guard
/// against them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyllabusNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub level: SyllabusLevel,
    pub order: i64,
}

/// Tree lookups over the syllabus outline.
#[async_trait]
pub trait SyllabusStore: Send + Sync {
    /// Fetch one node, failing with [`ServiceError::NotFound`] if absent.
    async fn get_node(&self, id: &str) -> Result<SyllabusNode, ServiceError>;

    /// Children of `parent_id` (roots when `None`) at the given level,
    /// ordered by their `order` column.
    async fn children(
        &self,
        parent_id: Option<&str>,
        level: SyllabusLevel,
    ) -> Result<Vec<SyllabusNode>, ServiceError>;

    /// Insert or replace a node. Used to seed and maintain the outline.
    async fn upsert_node(&self, node: SyllabusNode) -> Result<(), ServiceError>;

    /// Path from the root of the tree down to `id`, root first.
    ///
    /// Walks `parent_id` links one fetch at a time and fails with
    /// [`ServiceError::NotFound`] if any link is dangling. A cyclic
    /// `parent_id` graph would loop forever; see [`SyllabusNode`].
    async fn get_path(&self, id: &str) -> Result<Vec<SyllabusNode>, ServiceError> {
        let mut path: Vec<SyllabusNode> = Vec::new();
        let mut current = Some(id.to_string());

        while let Some(node_id) = current {
            let node = self.get_node(&node_id).await?;
            current = node.parent_id.clone();
            path.insert(0, node);
        }

        Ok(path)
    }
}
