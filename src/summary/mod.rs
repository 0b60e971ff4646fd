//! Chunk summarization.
//!
//! Each story chunk is compressed into a bounded narrative summary by a chat
//! model, then post-processed so the output always satisfies the same
//! invariants: no model preamble, collapsed whitespace, initial capital,
//! terminal punctuation, and a hard word budget.

use crate::chunking::StoryChunk;
use crate::config::Prompts;
use crate::error::{FortellError, Result};
use crate::llm::{ChatTurn, TextGenerator};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Summarizer for story chunks.
pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
    prompts: Prompts,
    max_words: usize,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>, prompts: Prompts, max_words: usize) -> Self {
        Self {
            generator,
            prompts,
            max_words,
        }
    }

    /// Summarize one chunk into a ≤`max_words` narrative string.
    ///
    /// An empty chunk is a clean failure; the orchestrator treats any single
    /// chunk failure as fatal to the whole batch.
    #[instrument(skip(self, chunk), fields(index = chunk.index, words = chunk.word_count))]
    pub async fn summarize(&self, chunk: &StoryChunk) -> Result<String> {
        if chunk.text.trim().is_empty() {
            return Err(FortellError::Summary(format!(
                "Chunk {} is empty, nothing to summarize",
                chunk.index + 1
            )));
        }

        let mut vars = HashMap::new();
        vars.insert("text".to_string(), chunk.text.clone());
        vars.insert("max_words".to_string(), self.max_words.to_string());
        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.summary.user, &vars);

        let raw = self
            .generator
            .generate(None, &[ChatTurn::user(prompt)])
            .await?;

        let summary = polish_summary(&raw, self.max_words);
        if summary.is_empty() {
            return Err(FortellError::Summary(format!(
                "Model returned no usable text for chunk {}",
                chunk.index + 1
            )));
        }

        debug!(
            "Chunk {} summarized to {} words",
            chunk.index + 1,
            summary.split_whitespace().count()
        );
        Ok(summary)
    }
}

/// Enforce the summary output contract on raw model text.
///
/// Strips known preamble phrases, collapses whitespace, forces an initial
/// capital and terminal punctuation, then caps the result at `max_words` by
/// greedily accumulating whole sentences. If not even the first sentence
/// fits, the first `max_words` words are kept instead.
pub fn polish_summary(raw: &str, max_words: usize) -> String {
    let preambles = [
        r"(?i)^here'?s?\s*(an?|my)?\s*(example|try|attempt|summary|story)?\s*:?\s*",
        r"(?i)^let me\s*(try|summarize|summarise)?\s*:?\s*",
        r"(?i)^i'?ll\s*(try|summarize|summarise)?\s*:?\s*",
        r"(?i)^(summary|story)\s*:\s*",
    ];

    let mut summary = raw.trim().to_string();
    for pattern in preambles {
        let re = Regex::new(pattern).unwrap_or_else(|_| unreachable!("static regex"));
        summary = re.replace(&summary, "").to_string();
    }

    let whitespace = Regex::new(r"\s+").unwrap_or_else(|_| unreachable!("static regex"));
    summary = whitespace.replace_all(summary.trim(), " ").to_string();

    if summary.is_empty() {
        return summary;
    }

    summary = capitalize_first(&summary);

    if !summary.ends_with(['.', '!', '?']) {
        summary.push('.');
    }

    let word_count = summary.split_whitespace().count();
    if word_count > max_words {
        summary = cap_to_sentences(&summary, max_words);
    }

    summary.trim().to_string()
}

/// Greedily accumulate whole sentences up to the word budget, falling back to
/// a raw word slice when the first sentence alone exceeds it.
fn cap_to_sentences(summary: &str, max_words: usize) -> String {
    let sentence_re = Regex::new(r"[^.!?]+[.!?]+").unwrap_or_else(|_| unreachable!("static regex"));

    let mut capped = String::new();
    let mut used_words = 0;

    for sentence in sentence_re.find_iter(summary) {
        let sentence_words = sentence.as_str().trim().split_whitespace().count();
        if used_words + sentence_words <= max_words {
            capped.push_str(sentence.as_str());
            used_words += sentence_words;
        } else {
            break;
        }
    }

    if capped.trim().is_empty() {
        let mut sliced = summary
            .split_whitespace()
            .take(max_words)
            .collect::<Vec<_>>()
            .join(" ");
        if !sliced.ends_with(['.', '!', '?']) {
            sliced.push('.');
        }
        return sliced;
    }

    capped.trim().to_string()
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedGenerator {
        reply: String,
        calls: AtomicUsize,
    }

    impl CannedGenerator {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(&self, _system: Option<&str>, _turns: &[ChatTurn]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    fn chunk(text: &str) -> StoryChunk {
        StoryChunk {
            index: 0,
            text: text.to_string(),
            word_count: text.split_whitespace().count(),
        }
    }

    fn assert_invariants(summary: &str, max_words: usize) {
        assert!(summary.split_whitespace().count() <= max_words, "{summary}");
        let first = summary.chars().next().unwrap();
        assert!(first.is_uppercase() || !first.is_alphabetic(), "{summary}");
        assert!(summary.ends_with(['.', '!', '?']), "{summary}");
    }

    #[test]
    fn test_polish_strips_preambles() {
        for raw in [
            "Here's a summary: the fox jumped",
            "Here's an example: the fox jumped",
            "Let me try: the fox jumped",
            "I'll summarize: the fox jumped",
            "Summary: the fox jumped",
            "Story: the fox jumped",
        ] {
            let polished = polish_summary(raw, 50);
            assert!(
                polished.to_lowercase().starts_with("the fox"),
                "{raw:?} -> {polished:?}"
            );
            assert_invariants(&polished, 50);
        }
    }

    #[test]
    fn test_polish_collapses_whitespace_and_punctuates() {
        let polished = polish_summary("a quick\n\nbrown   fox", 50);
        assert_eq!(polished, "A quick brown fox.");
    }

    #[test]
    fn test_polish_caps_by_whole_sentences() {
        let raw = "One two three four five. Six seven eight. Nine ten eleven twelve thirteen.";
        let polished = polish_summary(raw, 8);
        assert_eq!(polished, "One two three four five. Six seven eight.");
        assert_invariants(&polished, 8);
    }

    #[test]
    fn test_polish_word_slice_fallback_when_no_sentence_fits() {
        let raw = "one two three four five six seven eight nine ten eleven twelve.";
        let polished = polish_summary(raw, 5);
        assert_eq!(polished, "One two three four five.");
        assert_invariants(&polished, 5);
    }

    #[test]
    fn test_polish_empty_input() {
        assert_eq!(polish_summary("", 50), "");
        assert_eq!(polish_summary("   \n ", 50), "");
    }

    #[tokio::test]
    async fn test_summarize_enforces_invariants() {
        let generator = Arc::new(CannedGenerator::new(
            "here's a summary: a village built a bridge across the river after decades of isolation",
        ));
        let summarizer = Summarizer::new(generator, Prompts::default(), 50);

        let summary = summarizer.summarize(&chunk("some article text")).await.unwrap();
        assert_invariants(&summary, 50);
        assert!(summary.starts_with("A village"));
    }

    #[tokio::test]
    async fn test_summarize_rejects_empty_chunk_without_calling_model() {
        let generator = Arc::new(CannedGenerator::new("anything"));
        let calls = &generator.calls;
        let summarizer = Summarizer::new(generator.clone(), Prompts::default(), 50);

        let err = summarizer.summarize(&chunk("   ")).await.unwrap_err();
        assert!(matches!(err, FortellError::Summary(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
