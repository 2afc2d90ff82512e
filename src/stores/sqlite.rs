//! SQLite-backed vector store using the `sqlite-vec` extension.
//!
//! Embeddings are stored as JSON float arrays and compared with
//! `vec_distance_cosine` inside the database, so ranking and thresholding
//! happen in SQL rather than in Rust.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Once;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, ffi};

use super::{EmbeddingRecord, RetrievalResult, VectorStore};
use crate::types::ServiceError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS embeddings (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    content_id  TEXT NOT NULL,
    text        TEXT NOT NULL,
    embedding   TEXT NOT NULL,
    metadata    TEXT NOT NULL DEFAULT '{}',
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_embeddings_content_id ON embeddings (content_id);
";

/// Vector store over a SQLite database with `sqlite-vec` loaded.
#[derive(Clone)]
pub struct SqliteVectorStore {
    conn: Connection,
}

impl SqliteVectorStore {
    /// Opens (or creates) the database at `path`, registers `sqlite-vec`, and
    /// ensures the schema exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| ServiceError::storage(err.to_string()))?;
        Self::from_connection(conn).await
    }

    /// Builds a store over an existing connection, verifying the vector
    /// extension is available.
    pub async fn from_connection(conn: Connection) -> Result<Self, ServiceError> {
        register_sqlite_vec()?;
        conn.call(|conn| -> tokio_rusqlite::Result<()> {
            conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))
                .map_err(tokio_rusqlite::Error::Error)?;
            conn.execute_batch(SCHEMA)
                .map_err(tokio_rusqlite::Error::Error)?;
            Ok(())
        })
        .await
        .map_err(|err| ServiceError::storage(err.to_string()))?;
        Ok(Self { conn })
    }

    /// Clone of the underlying connection, for co-located stores that share
    /// the same database file.
    pub fn connection(&self) -> Connection {
        self.conn.clone()
    }
}

/// Registers `sqlite-vec` as an auto-extension, once per process.
fn register_sqlite_vec() -> Result<(), ServiceError> {
    use std::sync::Mutex;

    static INIT: Once = Once::new();
    static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

    INIT.call_once(|| {
        let result = unsafe {
            type SqliteExtensionInit = unsafe extern "C" fn(
                *mut ffi::sqlite3,
                *mut *mut c_char,
                *const ffi::sqlite3_api_routines,
            ) -> i32;

            let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
            let init_fn: SqliteExtensionInit =
                transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
            let rc = ffi::sqlite3_auto_extension(Some(init_fn));
            if rc != 0 {
                Err(format!("failed to register sqlite-vec extension (code {rc})"))
            } else {
                Ok(())
            }
        };
        *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
    });

    INIT_RESULT
        .lock()
        .expect("init result mutex poisoned")
        .clone()
        .expect("init was called but result not set")
        .map_err(ServiceError::Storage)
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert(&self, records: Vec<EmbeddingRecord>) -> Result<(), ServiceError> {
        if records.is_empty() {
            return Ok(());
        }

        // Serialize outside the connection closure so JSON failures surface
        // before any SQL runs.
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let embedding_json = serde_json::to_string(&record.embedding)
                .map_err(|err| ServiceError::storage(err.to_string()))?;
            rows.push((
                record.content_id,
                record.text,
                embedding_json,
                record.metadata.to_string(),
                chrono::Utc::now().to_rfc3339(),
            ));
        }

        self.conn
            .call(move |conn| -> tokio_rusqlite::Result<()> {
                let tx = conn.transaction().map_err(tokio_rusqlite::Error::Error)?;
                {
                    let mut stmt = tx
                        .prepare(
                            "INSERT INTO embeddings (content_id, text, embedding, metadata, created_at) \
                             VALUES (?1, ?2, ?3, ?4, ?5)",
                        )
                        .map_err(tokio_rusqlite::Error::Error)?;
                    for row in rows {
                        stmt.execute(row).map_err(tokio_rusqlite::Error::Error)?;
                    }
                }
                tx.commit().map_err(tokio_rusqlite::Error::Error)?;
                Ok(())
            })
            .await
            .map_err(|err| ServiceError::storage(err.to_string()))
    }

    async fn query(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<RetrievalResult>, ServiceError> {
        let embedding_json = serde_json::to_string(embedding)
            .map_err(|err| ServiceError::storage(err.to_string()))?;

        self.conn
            .call(move |conn| -> tokio_rusqlite::Result<Vec<RetrievalResult>> {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, content_id, text, metadata, similarity FROM ( \
                             SELECT id, content_id, text, metadata, \
                                    1.0 - vec_distance_cosine(vec_f32(embedding), vec_f32(?1)) \
                                        AS similarity \
                             FROM embeddings \
                         ) \
                         WHERE similarity >= ?2 \
                         ORDER BY similarity DESC \
                         LIMIT ?3",
                    )
                    .map_err(tokio_rusqlite::Error::Error)?;

                let rows = stmt
                    .query_map(
                        (embedding_json, threshold as f64, limit as i64),
                        |row| {
                            let metadata_raw: String = row.get(3)?;
                            Ok(RetrievalResult {
                                id: row.get(0)?,
                                content_id: row.get(1)?,
                                text: row.get(2)?,
                                metadata: serde_json::from_str(&metadata_raw)
                                    .unwrap_or_default(),
                                similarity: row.get::<_, f64>(4)? as f32,
                            })
                        },
                    )
                    .map_err(tokio_rusqlite::Error::Error)?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row.map_err(tokio_rusqlite::Error::Error)?);
                }
                Ok(results)
            })
            .await
            .map_err(|err| ServiceError::storage(err.to_string()))
    }

    async fn count(&self) -> Result<usize, ServiceError> {
        self.conn
            .call(|conn| -> tokio_rusqlite::Result<usize> {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Error)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| ServiceError::storage(err.to_string()))
    }
}
