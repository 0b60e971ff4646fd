//! Retrieval-augmented chat.
//!
//! Each question runs the same sequence: rewrite the follow-up into a
//! standalone query using the session history, retrieve budgeted context from
//! the index, short-circuit with a fixed message when nothing relevant comes
//! back, and otherwise answer with the model constrained to the retrieved
//! context. Only a successfully answered question mutates the history.

mod session;

pub use session::SessionStore;

use crate::config::{Prompts, RagSettings};
use crate::error::Result;
use crate::index::{RagStore, ScoredChunk};
use crate::llm::{ChatTurn, TextGenerator};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Fixed response when retrieval produces no usable context.
pub const NO_CONTEXT_MESSAGE: &str =
    "I don't have any relevant information in my knowledge base to answer this question.";

/// Session ID used when the caller does not supply one.
pub const DEFAULT_SESSION: &str = "default";

/// Answer produced by the RAG chat flow.
#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub message: String,
    /// How many retrieved chunks backed the answer.
    pub total_results: usize,
}

/// The RAG chat orchestrator.
pub struct RagChat {
    generator: Arc<dyn TextGenerator>,
    store: Arc<RagStore>,
    prompts: Prompts,
    sessions: SessionStore,
    token_budget: usize,
}

impl RagChat {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<RagStore>,
        prompts: Prompts,
        settings: &RagSettings,
    ) -> Self {
        Self {
            generator,
            store,
            prompts,
            sessions: SessionStore::new(
                settings.max_session_turns,
                Duration::from_secs(settings.session_ttl_seconds),
            ),
            token_budget: settings.token_budget,
        }
    }

    /// Answer a question against the index, scoped to `doc_id` when given.
    #[instrument(skip(self, question), fields(session = %session_id))]
    pub async fn chat(
        &self,
        session_id: &str,
        question: &str,
        doc_id: Option<&str>,
    ) -> Result<RagAnswer> {
        let history = self.sessions.snapshot(session_id);

        let query = self.rewrite_query(&history, question).await?;
        debug!("Retrieval query: {}", query);

        let retrieved = self
            .store
            .get_relevant_content(&query, self.token_budget, doc_id)
            .await?;

        let context = format_context(&retrieved);
        if context.trim().is_empty() {
            info!("No relevant context found, returning fixed response");
            return Ok(RagAnswer {
                message: NO_CONTEXT_MESSAGE.to_string(),
                total_results: 0,
            });
        }

        let mut vars = HashMap::new();
        vars.insert("context".to_string(), context);
        let system = self
            .prompts
            .render_with_custom(&self.prompts.rag.answer_system, &vars);

        // The *original* question goes into history, not the rewrite.
        let mut turns = history;
        turns.push(ChatTurn::user(question));

        let answer = self.generator.generate(Some(&system), &turns).await?;

        self.sessions.append(
            session_id,
            [ChatTurn::user(question), ChatTurn::model(answer.clone())],
        );

        Ok(RagAnswer {
            message: answer,
            total_results: retrieved.len(),
        })
    }

    /// Rewrite a follow-up question into a standalone query.
    ///
    /// With no history the question already stands alone, so no model call is
    /// made. The rewrite never mutates the session.
    async fn rewrite_query(&self, history: &[ChatTurn], question: &str) -> Result<String> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let mut turns = history.to_vec();
        turns.push(ChatTurn::user(question));

        let rewritten = self
            .generator
            .generate(Some(&self.prompts.rag.rewrite_system), &turns)
            .await?;

        let rewritten = rewritten.trim();
        if rewritten.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(rewritten.to_string())
        }
    }

    /// Clear one session's history.
    pub fn clear_session(&self, session_id: &str) -> bool {
        self.sessions.clear(session_id)
    }

    /// Clear every session.
    pub fn clear_all_sessions(&self) {
        self.sessions.clear_all()
    }
}

/// Render retrieved chunks into the context block fed to the model.
fn format_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "Document {} (Score: {:.3}):\n{}",
                i + 1,
                chunk.score,
                chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::index::doc_id_for_url;
    use crate::vector_store::MemoryVectorStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGenerator {
        calls: AtomicUsize,
    }

    impl CountingGenerator {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for CountingGenerator {
        async fn generate(&self, system: Option<&str>, _turns: &[ChatTurn]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if system.is_some_and(|s| s.contains("query rewriting")) {
                Ok("standalone question".to_string())
            } else {
                Ok("The article is about rivers.".to_string())
            }
        }
    }

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn rag_store() -> Arc<RagStore> {
        Arc::new(RagStore::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(StubEmbedder),
            1000,
            200,
            20,
        ))
    }

    fn rag_chat(generator: Arc<CountingGenerator>, store: Arc<RagStore>) -> RagChat {
        RagChat::new(
            generator,
            store,
            Prompts::default(),
            &RagSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_empty_retrieval_short_circuits_without_model_call() {
        let generator = CountingGenerator::new();
        let chat = rag_chat(generator.clone(), rag_store());

        let answer = chat
            .chat(DEFAULT_SESSION, "What is this about?", Some("never-indexed"))
            .await
            .unwrap();

        assert_eq!(answer.message, NO_CONTEXT_MESSAGE);
        assert_eq!(answer.total_results, 0);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);

        // History must not have been touched
        assert!(!chat.clear_session(DEFAULT_SESSION));
    }

    #[tokio::test]
    async fn test_answer_flow_appends_history() {
        let generator = CountingGenerator::new();
        let store = rag_store();
        let doc_id = doc_id_for_url("https://example.com");
        store
            .add_document(&doc_id, "rivers carve valleys over millennia", "https://example.com")
            .await
            .unwrap();

        let chat = rag_chat(generator.clone(), store);

        let answer = chat
            .chat("s1", "What is this about?", Some(&doc_id))
            .await
            .unwrap();
        assert_eq!(answer.message, "The article is about rivers.");
        assert_eq!(answer.total_results, 1);
        // First question: no rewrite call, one answer call
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

        // Follow-up: rewrite + answer
        let follow_up = chat.chat("s1", "How long does it take?", Some(&doc_id)).await.unwrap();
        assert_eq!(follow_up.message, "The article is about rivers.");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);

        // Session history persists and can be cleared
        assert!(chat.clear_session("s1"));
    }

    #[tokio::test]
    async fn test_sessions_do_not_leak_across_ids() {
        let generator = CountingGenerator::new();
        let store = rag_store();
        let doc_id = doc_id_for_url("https://example.com");
        store
            .add_document(&doc_id, "some indexed content", "https://example.com")
            .await
            .unwrap();

        let chat = rag_chat(generator.clone(), store);
        chat.chat("a", "first question", Some(&doc_id)).await.unwrap();

        // A different session has no history, so its first question skips the
        // rewrite call.
        let calls_before = generator.calls.load(Ordering::SeqCst);
        chat.chat("b", "another question", Some(&doc_id)).await.unwrap();
        assert_eq!(generator.calls.load(Ordering::SeqCst), calls_before + 1);
    }

    #[test]
    fn test_format_context() {
        let chunks = vec![
            ScoredChunk {
                content: "alpha".into(),
                score: 0.91,
                doc_id: "d".into(),
                chunk_index: 0,
            },
            ScoredChunk {
                content: "beta".into(),
                score: 0.5,
                doc_id: "d".into(),
                chunk_index: 1,
            },
        ];
        let context = format_context(&chunks);
        assert!(context.starts_with("Document 1 (Score: 0.910):\nalpha"));
        assert!(context.contains("\n\n---\n\n"));
        assert!(context.contains("Document 2 (Score: 0.500):\nbeta"));
    }

    #[test]
    fn test_format_context_empty() {
        assert_eq!(format_context(&[]), "");
    }
}
