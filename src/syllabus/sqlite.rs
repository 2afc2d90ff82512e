//! SQLite-backed syllabus store.
//!
//! Shares the database file with the vector store but owns its own table;
//! the two concerns never join.

use std::path::Path;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, OptionalExtension};

use super::{SyllabusLevel, SyllabusNode, SyllabusStore};
use crate::types::ServiceError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS syllabus_nodes (
    id          TEXT PRIMARY KEY,
    parent_id   TEXT,
    title       TEXT NOT NULL,
    description TEXT,
    level       TEXT NOT NULL,
    "order"     INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_syllabus_parent ON syllabus_nodes (parent_id);
"#;

const NODE_COLUMNS: &str = r#"id, parent_id, title, description, level, "order""#;

/// Row shape before the level column is parsed into [`SyllabusLevel`].
type RawNode = (String, Option<String>, String, Option<String>, String, i64);

fn into_node(raw: RawNode) -> Result<SyllabusNode, ServiceError> {
    let (id, parent_id, title, description, level_raw, order) = raw;
    let level = SyllabusLevel::from_db(&level_raw).ok_or_else(|| {
        ServiceError::storage(format!(
            "syllabus node '{id}' has unknown level '{level_raw}'"
        ))
    })?;
    Ok(SyllabusNode {
        id,
        parent_id,
        title,
        description,
        level,
        order,
    })
}

#[derive(Clone)]
pub struct SqliteSyllabusStore {
    conn: Connection,
}

impl SqliteSyllabusStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let conn = Connection::open(path)
            .await
            .map_err(|err| ServiceError::storage(err.to_string()))?;
        Self::from_connection(conn).await
    }

    /// Builds a store over an existing connection, typically the vector
    /// store's, and ensures the table exists.
    pub async fn from_connection(conn: Connection) -> Result<Self, ServiceError> {
        conn.call(|conn| -> tokio_rusqlite::Result<()> {
            conn.execute_batch(SCHEMA)
                .map_err(tokio_rusqlite::Error::Error)?;
            Ok(())
        })
        .await
        .map_err(|err| ServiceError::storage(err.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl SyllabusStore for SqliteSyllabusStore {
    async fn get_node(&self, id: &str) -> Result<SyllabusNode, ServiceError> {
        let node_id = id.to_string();
        let found: Option<RawNode> = self
            .conn
            .call(move |conn| -> tokio_rusqlite::Result<Option<RawNode>> {
                conn.prepare(&format!(
                    "SELECT {NODE_COLUMNS} FROM syllabus_nodes WHERE id = ?1"
                ))
                .map_err(tokio_rusqlite::Error::Error)?
                .query_row([&node_id], |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                })
                .optional()
                .map_err(tokio_rusqlite::Error::Error)
            })
            .await
            .map_err(|err| ServiceError::storage(err.to_string()))?;

        match found {
            Some(raw) => into_node(raw),
            None => Err(ServiceError::not_found("syllabus node", id)),
        }
    }

    async fn children(
        &self,
        parent_id: Option<&str>,
        level: SyllabusLevel,
    ) -> Result<Vec<SyllabusNode>, ServiceError> {
        let parent = parent_id.map(str::to_string);
        let raw_nodes: Vec<RawNode> = self
            .conn
            .call(move |conn| -> tokio_rusqlite::Result<Vec<RawNode>> {
                let (sql, params): (String, Vec<String>) = match parent {
                    Some(parent) => (
                        format!(
                            "SELECT {NODE_COLUMNS} FROM syllabus_nodes \
                             WHERE level = ?1 AND parent_id = ?2 ORDER BY \"order\""
                        ),
                        vec![level.as_str().to_string(), parent],
                    ),
                    None => (
                        format!(
                            "SELECT {NODE_COLUMNS} FROM syllabus_nodes \
                             WHERE level = ?1 AND parent_id IS NULL ORDER BY \"order\""
                        ),
                        vec![level.as_str().to_string()],
                    ),
                };

                let mut stmt = conn
                    .prepare(&sql)
                    .map_err(tokio_rusqlite::Error::Error)?;
                let rows = stmt
                    .query_map(
                        tokio_rusqlite::params_from_iter(params.iter()),
                        |row| {
                            Ok((
                                row.get(0)?,
                                row.get(1)?,
                                row.get(2)?,
                                row.get(3)?,
                                row.get(4)?,
                                row.get(5)?,
                            ))
                        },
                    )
                    .map_err(tokio_rusqlite::Error::Error)?;

                let mut nodes = Vec::new();
                for row in rows {
                    nodes.push(row.map_err(tokio_rusqlite::Error::Error)?);
                }
                Ok(nodes)
            })
            .await
            .map_err(|err| ServiceError::storage(err.to_string()))?;

        raw_nodes.into_iter().map(into_node).collect()
    }

    async fn upsert_node(&self, node: SyllabusNode) -> Result<(), ServiceError> {
        self.conn
            .call(move |conn| -> tokio_rusqlite::Result<()> {
                conn.execute(
                    "INSERT OR REPLACE INTO syllabus_nodes \
                     (id, parent_id, title, description, level, \"order\") \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    (
                        node.id,
                        node.parent_id,
                        node.title,
                        node.description,
                        node.level.as_str(),
                        node.order,
                    ),
                )
                .map_err(tokio_rusqlite::Error::Error)?;
                Ok(())
            })
            .await
            .map_err(|err| ServiceError::storage(err.to_string()))
    }
}
