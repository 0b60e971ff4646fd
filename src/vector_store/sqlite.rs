//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity. For
//! large indexes consider the sqlite-vec extension or a dedicated vector
//! database.

use super::{cosine_similarity, IndexEntry, IndexedDocument, SearchResult, VectorStore};
use crate::error::{FortellError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS index_entries (
    id TEXT PRIMARY KEY,
    doc_id TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    source TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_doc_id ON index_entries(doc_id);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<IndexEntry> {
        let embedding_bytes: Vec<u8> = row.get(4)?;
        let created_at_str: String = row.get(6)?;

        Ok(IndexEntry {
            id: row.get(0)?,
            doc_id: row.get(1)?,
            chunk_index: row.get(2)?,
            content: row.get(3)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            source: row.get(5)?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, entries))]
    async fn upsert_batch(&self, entries: &[IndexEntry]) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| FortellError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let tx = conn.unchecked_transaction()?;

        for entry in entries {
            let embedding_bytes = Self::embedding_to_bytes(&entry.embedding);

            tx.execute(
                r#"
                INSERT OR REPLACE INTO index_entries
                (id, doc_id, chunk_index, content, embedding, source, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    entry.id,
                    entry.doc_id,
                    entry.chunk_index,
                    entry.content,
                    embedding_bytes,
                    entry.source,
                    entry.created_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        debug!("Batch upserted {} entries", entries.len());
        Ok(entries.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        doc_id: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| FortellError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        const COLUMNS: &str = "id, doc_id, chunk_index, content, embedding, source, created_at";

        let mut results: Vec<SearchResult> = match doc_id {
            Some(doc_id) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM index_entries WHERE doc_id = ?1",
                    COLUMNS
                ))?;
                let entries = stmt.query_map(params![doc_id], Self::row_to_entry)?;
                entries
                    .filter_map(|e| e.ok())
                    .map(|entry| {
                        let score = cosine_similarity(query_embedding, &entry.embedding);
                        SearchResult { entry, score }
                    })
                    .collect()
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("SELECT {} FROM index_entries", COLUMNS))?;
                let entries = stmt.query_map([], Self::row_to_entry)?;
                entries
                    .filter_map(|e| e.ok())
                    .map(|entry| {
                        let score = cosine_similarity(query_embedding, &entry.embedding);
                        SearchResult { entry, score }
                    })
                    .collect()
            }
        };

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        debug!("Found {} matching entries", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn ids_for_doc(&self, doc_id: &str) -> Result<Vec<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| FortellError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let mut stmt = conn
            .prepare("SELECT id FROM index_entries WHERE doc_id = ?1 ORDER BY chunk_index")?;
        let ids = stmt.query_map(params![doc_id], |row| row.get::<_, String>(0))?;

        Ok(ids.filter_map(|id| id.ok()).collect())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn delete_many(&self, ids: &[String]) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| FortellError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let tx = conn.unchecked_transaction()?;
        let mut deleted = 0;
        for id in ids {
            deleted += tx.execute("DELETE FROM index_entries WHERE id = ?1", params![id])?;
        }
        tx.commit()?;

        debug!("Deleted {} entries", deleted);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn list_documents(&self) -> Result<Vec<IndexedDocument>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| FortellError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT doc_id, COUNT(*) as chunk_count, MAX(source) as source,
                   MAX(created_at) as created_at
            FROM index_entries
            GROUP BY doc_id
            ORDER BY created_at DESC
            "#,
        )?;

        let documents = stmt.query_map([], |row| {
            let created_at_str: String = row.get(3)?;
            Ok(IndexedDocument {
                doc_id: row.get(0)?,
                chunk_count: row.get(1)?,
                source: row.get(2)?,
                created_at: DateTime::parse_from_rfc3339(&created_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        Ok(documents.filter_map(|d| d.ok()).collect())
    }

    async fn entry_count(&self) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| FortellError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM index_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| FortellError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        conn.execute("DELETE FROM index_entries", [])?;
        info!("Cleared retrieval index");
        Ok(())
    }
}
