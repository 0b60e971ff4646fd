//! Text chunking for the story pipeline and the retrieval index.
//!
//! Two distinct strategies live here: the story chunker cuts scraped text into
//! exactly three word-range segments for summarization, and the index chunker
//! produces overlapping character windows for embedding.

use serde::{Deserialize, Serialize};

/// How many story segments every job produces.
pub const STORY_COUNT: usize = 3;

/// A contiguous word-range slice of the source text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryChunk {
    /// Position of this chunk in the job (0-based).
    pub index: usize,
    /// The chunk text. May be empty for very short source documents.
    pub text: String,
    /// Number of words in this chunk.
    pub word_count: usize,
}

/// Split normalized text into exactly [`STORY_COUNT`] chunks.
///
/// Texts at or below `equal_split_threshold` words are partitioned into three
/// nearly-equal contiguous ranges covering the whole text. Longer texts yield
/// three fixed windows of `window_words` each, starting at 0, W and 2W; words
/// beyond the third window are discarded.
pub fn split_into_stories(
    text: &str,
    equal_split_threshold: usize,
    window_words: usize,
) -> Vec<StoryChunk> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let total = words.len();

    let mut chunks = Vec::with_capacity(STORY_COUNT);

    if total <= equal_split_threshold {
        let chunk_size = total.div_ceil(STORY_COUNT);
        for i in 0..STORY_COUNT {
            let start = (i * chunk_size).min(total);
            let end = ((i + 1) * chunk_size).min(total);
            let slice = &words[start..end];
            chunks.push(StoryChunk {
                index: i,
                text: slice.join(" "),
                word_count: slice.len(),
            });
        }
    } else {
        for i in 0..STORY_COUNT {
            let start = (i * window_words).min(total);
            let end = ((i + 1) * window_words).min(total);
            let slice = &words[start..end];
            chunks.push(StoryChunk {
                index: i,
                text: slice.join(" "),
                word_count: slice.len(),
            });
        }
    }

    chunks
}

/// Split text into overlapping character windows for the retrieval index.
///
/// Each chunk is at most `chunk_chars` characters; consecutive chunks share
/// `overlap` characters. Where possible a chunk ends on a whitespace boundary
/// so words are not cut mid-way.
pub fn split_for_index(text: &str, chunk_chars: usize, overlap: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || chunk_chars == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    let step = chunk_chars.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let hard_end = (start + chunk_chars).min(chars.len());

        // Back off to the last whitespace inside the window, unless this is
        // the final window or there is none to back off to.
        let end = if hard_end < chars.len() {
            chars[start..hard_end]
                .iter()
                .rposition(|c| c.is_whitespace())
                .map(|pos| start + pos)
                .filter(|&e| e > start)
                .unwrap_or(hard_end)
        } else {
            hard_end
        };

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim().to_string();
        if !chunk.is_empty() {
            chunks.push(chunk);
        }

        if hard_end == chars.len() {
            break;
        }
        start += step.min(end.saturating_sub(start).max(1));
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_text(n: usize) -> String {
        (1..=n)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_always_three_chunks() {
        for n in [0, 1, 2, 3, 10, 299, 300, 15000] {
            let chunks = split_into_stories(&word_text(n), 15000, 5000);
            assert_eq!(chunks.len(), STORY_COUNT, "n = {}", n);
        }
    }

    #[test]
    fn test_short_text_covers_everything_in_order() {
        let text = word_text(300);
        let chunks = split_into_stories(&text, 15000, 5000);

        let covered: usize = chunks.iter().map(|c| c.word_count).sum();
        assert_eq!(covered, 300);

        // Near-equal partitions
        assert_eq!(chunks[0].word_count, 100);
        assert_eq!(chunks[1].word_count, 100);
        assert_eq!(chunks[2].word_count, 100);

        // Concatenation preserves source order
        let joined = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(joined, text);
    }

    #[test]
    fn test_long_text_takes_fixed_windows_and_discards_tail() {
        let chunks = split_into_stories(&word_text(17000), 15000, 5000);
        assert_eq!(chunks[0].word_count, 5000);
        assert_eq!(chunks[1].word_count, 5000);
        assert_eq!(chunks[2].word_count, 5000);
        assert!(chunks[0].text.starts_with("word1 "));
        assert!(chunks[1].text.starts_with("word5001 "));
        assert!(chunks[2].text.ends_with("word15000"));

        let covered: usize = chunks.iter().map(|c| c.word_count).sum();
        assert!(covered <= 17000);
    }

    #[test]
    fn test_tiny_text_yields_empty_chunks() {
        let chunks = split_into_stories("one two", 15000, 5000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "one");
        assert_eq!(chunks[1].text, "two");
        assert_eq!(chunks[2].text, "");
        assert_eq!(chunks[2].word_count, 0);
    }

    #[test]
    fn test_index_chunks_overlap() {
        let text = word_text(500); // ~3500 chars
        let chunks = split_for_index(&text, 1000, 200);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1000);
        }
        // Consecutive chunks share content
        let tail: String = chunks[0].chars().skip(chunks[0].chars().count() - 50).collect();
        assert!(chunks[1].contains(tail.split_whitespace().next().unwrap()));
    }

    #[test]
    fn test_index_chunks_empty_input() {
        assert!(split_for_index("", 1000, 200).is_empty());
        assert!(split_for_index("   ", 1000, 200).is_empty());
    }

    #[test]
    fn test_index_chunks_short_input_single_chunk() {
        let chunks = split_for_index("just a few words", 1000, 200);
        assert_eq!(chunks, vec!["just a few words".to_string()]);
    }
}
