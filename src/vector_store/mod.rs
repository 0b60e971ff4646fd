//! Vector store abstraction for the retrieval index.
//!
//! Provides a trait-based interface so the SQLite-backed store and the
//! in-memory test store are interchangeable.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An embedded text chunk stored in the retrieval index.
///
/// Chunk IDs are deterministic per document: `{doc_id}_chunk_{index}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Deterministic entry ID.
    pub id: String,
    /// Document this chunk belongs to.
    pub doc_id: String,
    /// Position of this chunk within the document.
    pub chunk_index: i64,
    /// Text content of this chunk.
    pub content: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// Where the document came from (its URL).
    pub source: String,
    /// When this entry was indexed.
    pub created_at: DateTime<Utc>,
}

impl IndexEntry {
    /// The deterministic ID for a chunk of a document.
    pub fn chunk_id(doc_id: &str, chunk_index: usize) -> String {
        format!("{}_chunk_{}", doc_id, chunk_index)
    }

    pub fn new(doc_id: &str, chunk_index: usize, content: String, embedding: Vec<f32>, source: &str) -> Self {
        Self {
            id: Self::chunk_id(doc_id, chunk_index),
            doc_id: doc_id.to_string(),
            chunk_index: chunk_index as i64,
            content,
            embedding,
            source: source.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// A search result with similarity score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub entry: IndexEntry,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

/// Summary information about an indexed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub doc_id: String,
    pub chunk_count: u32,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert entries; existing IDs are replaced.
    async fn upsert_batch(&self, entries: &[IndexEntry]) -> Result<usize>;

    /// Similarity search, optionally restricted to a single document.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        doc_id: Option<&str>,
    ) -> Result<Vec<SearchResult>>;

    /// IDs of all entries belonging to a document.
    async fn ids_for_doc(&self, doc_id: &str) -> Result<Vec<String>>;

    /// Delete entries by ID; returns how many were removed.
    async fn delete_many(&self, ids: &[String]) -> Result<usize>;

    /// List all indexed documents.
    async fn list_documents(&self) -> Result<Vec<IndexedDocument>>;

    /// Total entry count.
    async fn entry_count(&self) -> Result<usize>;

    /// Remove every entry in the index.
    async fn clear(&self) -> Result<()>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_chunk_id_is_deterministic() {
        assert_eq!(IndexEntry::chunk_id("doc", 0), "doc_chunk_0");
        assert_eq!(IndexEntry::chunk_id("doc", 7), "doc_chunk_7");
    }
}
