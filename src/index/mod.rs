//! Retrieval index operations over the vector store.
//!
//! Documents are chunked, embedded and stored under deterministic chunk IDs.
//! Re-adding a document deletes its previous chunks first, so the index
//! always reflects the latest version of a URL's content.

use crate::chunking::split_for_index;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{IndexEntry, IndexedDocument, VectorStore};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Upper bound on how many IDs a single delete round-trip carries.
const DELETE_BATCH_SIZE: usize = 100;

/// Minimum leftover budget worth a global top-up search.
const GLOBAL_TOPUP_MIN_TOKENS: f64 = 10_000.0;

/// Derive the deterministic document ID for a URL.
///
/// The same URL always maps to the same ID, so re-summarizing a page
/// overwrites its index entries instead of duplicating them.
pub fn doc_id_for_url(url: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes())
        .simple()
        .to_string()
}

/// A retrieved chunk with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub content: String,
    pub score: f32,
    pub doc_id: String,
    pub chunk_index: i64,
}

/// Rough token estimate for budget accounting.
pub fn estimate_tokens(text: &str) -> f64 {
    text.split_whitespace().count() as f64 * 1.33
}

/// The retrieval index: chunking, embedding and scoped search over a
/// [`VectorStore`].
pub struct RagStore {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    chunk_chars: usize,
    chunk_overlap: usize,
    search_k: usize,
}

impl RagStore {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        chunk_chars: usize,
        chunk_overlap: usize,
        search_k: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            chunk_chars,
            chunk_overlap,
            search_k,
        }
    }

    /// Index a document's text, replacing any previous version.
    ///
    /// Returns the number of chunks indexed.
    #[instrument(skip(self, text), fields(doc_id = %doc_id, chars = text.len()))]
    pub async fn add_document(&self, doc_id: &str, text: &str, source: &str) -> Result<usize> {
        // Delete-before-insert: old chunks must be gone before the new set
        // lands, and the two phases never run concurrently for one doc_id.
        self.delete_document(doc_id).await?;

        let chunks = split_for_index(text, self.chunk_chars, self.chunk_overlap);
        if chunks.is_empty() {
            debug!("No chunks produced for document {}", doc_id);
            return Ok(0);
        }

        let embeddings = self.embedder.embed_batch(&chunks).await?;

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (content, embedding))| {
                IndexEntry::new(doc_id, i, content, embedding, source)
            })
            .collect();

        let count = self.store.upsert_batch(&entries).await?;
        info!("Indexed {} chunks for document {}", count, doc_id);
        Ok(count)
    }

    /// Delete every chunk of a document, in bounded batches.
    ///
    /// Silent when the document has no chunks.
    #[instrument(skip(self))]
    pub async fn delete_document(&self, doc_id: &str) -> Result<usize> {
        let ids = self.store.ids_for_doc(doc_id).await?;
        if ids.is_empty() {
            return Ok(0);
        }

        let mut deleted = 0;
        for batch in ids.chunks(DELETE_BATCH_SIZE) {
            deleted += self.store.delete_many(batch).await?;
        }

        info!("Deleted {} chunks for document {}", deleted, doc_id);
        Ok(deleted)
    }

    /// Similarity search, optionally scoped to one document.
    #[instrument(skip(self, query))]
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        doc_id: Option<&str>,
    ) -> Result<Vec<ScoredChunk>> {
        let query_embedding = self.embedder.embed(query).await?;
        let results = self.store.search(&query_embedding, limit, doc_id).await?;

        Ok(results
            .into_iter()
            .map(|r| ScoredChunk {
                content: r.entry.content,
                score: r.score,
                doc_id: r.entry.doc_id,
                chunk_index: r.entry.chunk_index,
            })
            .collect())
    }

    /// Two-phase budgeted retrieval.
    ///
    /// Results scoped to `doc_id` are collected first, under the estimated
    /// token budget. If they already fill 80% of it the scoped set is
    /// returned as-is; otherwise a global search tops up the remainder,
    /// skipping chunks the scoped pass already pulled. The final set is
    /// sorted by descending similarity.
    #[instrument(skip(self, query), fields(budget = max_tokens))]
    pub async fn get_relevant_content(
        &self,
        query: &str,
        max_tokens: usize,
        doc_id: Option<&str>,
    ) -> Result<Vec<ScoredChunk>> {
        let budget = max_tokens as f64;
        let mut results: Vec<ScoredChunk> = Vec::new();
        let mut used_tokens = 0.0;

        if let Some(id) = doc_id {
            for chunk in self.search(query, self.search_k, Some(id)).await? {
                let estimated = estimate_tokens(&chunk.content);
                if used_tokens + estimated <= budget {
                    results.push(chunk);
                    used_tokens += estimated;
                }
            }

            if used_tokens >= budget * 0.8 {
                sort_by_score(&mut results);
                return Ok(results);
            }
        }

        if budget - used_tokens > GLOBAL_TOPUP_MIN_TOKENS {
            for chunk in self.search(query, self.search_k, None).await? {
                if doc_id.is_some_and(|id| chunk.doc_id == id) {
                    continue;
                }
                let estimated = estimate_tokens(&chunk.content);
                if used_tokens + estimated <= budget {
                    results.push(chunk);
                    used_tokens += estimated;
                } else {
                    break;
                }
            }
        }

        sort_by_score(&mut results);
        debug!(
            "Retrieved {} chunks (~{:.0} tokens)",
            results.len(),
            used_tokens
        );
        Ok(results)
    }

    /// List all indexed documents.
    pub async fn list_documents(&self) -> Result<Vec<IndexedDocument>> {
        self.store.list_documents().await
    }

    /// Total number of index entries.
    pub async fn entry_count(&self) -> Result<usize> {
        self.store.entry_count().await
    }

    /// Drop the entire index.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }
}

fn sort_by_score(results: &mut [ScoredChunk]) {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::vector_store::MemoryVectorStore;
    use async_trait::async_trait;

    /// Deterministic embedder: the vector depends only on text length and
    /// first byte, which is enough to distinguish test inputs.
    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let first = text.bytes().next().unwrap_or(0) as f32;
            Ok(vec![first / 255.0, text.len() as f32 / 1000.0, 1.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    fn rag_store() -> RagStore {
        RagStore::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(StubEmbedder),
            1000,
            200,
            20,
        )
    }

    #[test]
    fn test_doc_id_deterministic() {
        let a = doc_id_for_url("https://example.com/article");
        let b = doc_id_for_url("https://example.com/article");
        let c = doc_id_for_url("https://example.com/other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0.0);
        assert!((estimate_tokens("one two three") - 3.99).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_reindex_replaces_previous_chunks() {
        let store = rag_store();
        let doc_id = doc_id_for_url("https://example.com");

        let first = store
            .add_document(&doc_id, "original content about rivers", "https://example.com")
            .await
            .unwrap();
        assert_eq!(first, 1);

        let long_text = "updated content ".repeat(200); // multiple chunks
        let second = store
            .add_document(&doc_id, &long_text, "https://example.com")
            .await
            .unwrap();
        assert!(second > 1);

        // Old content is unreachable after re-add
        let results = store.search("anything", 50, Some(&doc_id)).await.unwrap();
        assert_eq!(results.len(), second);
        assert!(results.iter().all(|r| r.content.contains("updated")));
        assert_eq!(store.entry_count().await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_delete_document_is_silent_when_missing() {
        let store = rag_store();
        assert_eq!(store.delete_document("nonexistent").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_relevant_content_scoped_first() {
        let store = rag_store();
        store
            .add_document("doc-a", "alpha text about mountains", "https://a")
            .await
            .unwrap();
        store
            .add_document("doc-b", "beta text about oceans", "https://b")
            .await
            .unwrap();

        let results = store
            .get_relevant_content("mountains", 120_000, Some("doc-a"))
            .await
            .unwrap();

        // Scoped chunk present, global top-up may add doc-b without duplicating doc-a
        assert!(results.iter().any(|r| r.doc_id == "doc-a"));
        let doc_a_count = results.iter().filter(|r| r.doc_id == "doc-a").count();
        assert_eq!(doc_a_count, 1);

        // Sorted by descending score
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_get_relevant_content_empty_index() {
        let store = rag_store();
        let results = store
            .get_relevant_content("anything", 120_000, Some("missing"))
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
