//! In-memory vector store, primarily for tests.

use super::{cosine_similarity, IndexEntry, IndexedDocument, SearchResult, VectorStore};
use crate::error::{FortellError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Vector store backed by a process-local map.
#[derive(Default)]
pub struct MemoryVectorStore {
    entries: Mutex<HashMap<String, IndexEntry>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_batch(&self, entries: &[IndexEntry]) -> Result<usize> {
        let mut map = self
            .entries
            .lock()
            .map_err(|e| FortellError::VectorStore(format!("Failed to acquire lock: {}", e)))?;
        for entry in entries {
            map.insert(entry.id.clone(), entry.clone());
        }
        Ok(entries.len())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        doc_id: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let map = self
            .entries
            .lock()
            .map_err(|e| FortellError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let mut results: Vec<SearchResult> = map
            .values()
            .filter(|entry| doc_id.map_or(true, |id| entry.doc_id == id))
            .map(|entry| SearchResult {
                score: cosine_similarity(query_embedding, &entry.embedding),
                entry: entry.clone(),
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        Ok(results)
    }

    async fn ids_for_doc(&self, doc_id: &str) -> Result<Vec<String>> {
        let map = self
            .entries
            .lock()
            .map_err(|e| FortellError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let mut entries: Vec<(&String, i64)> = map
            .values()
            .filter(|entry| entry.doc_id == doc_id)
            .map(|entry| (&entry.id, entry.chunk_index))
            .collect();
        entries.sort_by_key(|(_, index)| *index);

        Ok(entries.into_iter().map(|(id, _)| id.clone()).collect())
    }

    async fn delete_many(&self, ids: &[String]) -> Result<usize> {
        let mut map = self
            .entries
            .lock()
            .map_err(|e| FortellError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let mut deleted = 0;
        for id in ids {
            if map.remove(id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn list_documents(&self) -> Result<Vec<IndexedDocument>> {
        let map = self
            .entries
            .lock()
            .map_err(|e| FortellError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let mut grouped: HashMap<String, IndexedDocument> = HashMap::new();
        for entry in map.values() {
            grouped
                .entry(entry.doc_id.clone())
                .and_modify(|doc| {
                    doc.chunk_count += 1;
                    if entry.created_at > doc.created_at {
                        doc.created_at = entry.created_at;
                    }
                })
                .or_insert_with(|| IndexedDocument {
                    doc_id: entry.doc_id.clone(),
                    chunk_count: 1,
                    source: entry.source.clone(),
                    created_at: entry.created_at,
                });
        }

        let mut documents: Vec<IndexedDocument> = grouped.into_values().collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn entry_count(&self) -> Result<usize> {
        let map = self
            .entries
            .lock()
            .map_err(|e| FortellError::VectorStore(format!("Failed to acquire lock: {}", e)))?;
        Ok(map.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut map = self
            .entries
            .lock()
            .map_err(|e| FortellError::VectorStore(format!("Failed to acquire lock: {}", e)))?;
        map.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_scoped_search() {
        let store = MemoryVectorStore::new();
        store
            .upsert_batch(&[
                IndexEntry::new("a", 0, "alpha".into(), vec![1.0, 0.0], "https://a"),
                IndexEntry::new("b", 0, "beta".into(), vec![1.0, 0.0], "https://b"),
            ])
            .await
            .unwrap();

        let all = store.search(&[1.0, 0.0], 10, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let scoped = store.search(&[1.0, 0.0], 10, Some("a")).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].entry.doc_id, "a");
    }
}
