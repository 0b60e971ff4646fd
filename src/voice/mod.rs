//! Neural text-to-speech voiceovers with word-level timing.
//!
//! Narration uses two synthesis calls per summary: one for word speech marks,
//! one for the MP3 audio stream. Both use identical text and voice parameters.
//! The audio and the timing JSON are written straight into the job's story
//! bundle, where the video composer picks them up.

mod http;
mod timing;

pub use http::NeuralTtsClient;
pub use timing::{build_timing, TimingMark, TimingTrack};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// One speech mark as reported by the synthesis engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechMark {
    /// Mark kind; only `word` marks contribute to timing.
    #[serde(rename = "type")]
    pub mark_type: String,
    /// The spoken token.
    pub value: String,
    /// Offset from the start of the stream, in milliseconds.
    pub time: u64,
    /// Reported duration in milliseconds, when the engine provides one.
    #[serde(default)]
    pub duration: Option<u64>,
}

/// Trait for neural TTS engines.
///
/// Marks and audio are separate operations; an engine able to return both in
/// one call may implement them against a shared response.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Request word-level speech marks for the text.
    async fn synthesize_marks(&self, text: &str) -> Result<Vec<SpeechMark>>;

    /// Request the MP3 audio stream for the text.
    async fn synthesize_audio(&self, text: &str) -> Result<Vec<u8>>;
}

/// Files produced for one narrated story segment.
#[derive(Debug, Clone)]
pub struct Voiceover {
    pub audio_file: PathBuf,
    pub timing_file: PathBuf,
    pub track: TimingTrack,
}

/// Synthesize narration for one summary and write it into the story bundle.
///
/// `index` is 1-based; files are named `voice-{index}.mp3` and
/// `voice-{index}-timing.json`.
#[instrument(skip(synthesizer, text), fields(index = index))]
pub async fn generate_voiceover(
    synthesizer: &dyn SpeechSynthesizer,
    text: &str,
    index: usize,
    bundle_dir: &Path,
    last_word_fallback_ms: u64,
) -> Result<Voiceover> {
    let marks = synthesizer.synthesize_marks(text).await?;
    let track = build_timing(&marks, last_word_fallback_ms);

    let audio = synthesizer.synthesize_audio(text).await?;

    let audio_file = bundle_dir.join(format!("voice-{}.mp3", index));
    tokio::fs::write(&audio_file, &audio).await?;

    let timing_file = bundle_dir.join(format!("voice-{}-timing.json", index));
    let timing_json = serde_json::to_string_pretty(&track)?;
    tokio::fs::write(&timing_file, timing_json).await?;

    debug!(
        "Voiceover {}: {} words, {:.3}s, {} audio bytes",
        index,
        track.words.len(),
        track.total_duration,
        audio.len()
    );

    Ok(Voiceover {
        audio_file,
        timing_file,
        track,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FortellError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSynthesizer {
        mark_calls: AtomicUsize,
        audio_calls: AtomicUsize,
    }

    impl FakeSynthesizer {
        fn new() -> Self {
            Self {
                mark_calls: AtomicUsize::new(0),
                audio_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeSynthesizer {
        async fn synthesize_marks(&self, text: &str) -> Result<Vec<SpeechMark>> {
            self.mark_calls.fetch_add(1, Ordering::SeqCst);
            if text.is_empty() {
                return Err(FortellError::Voice("empty text".into()));
            }
            Ok(text
                .split_whitespace()
                .enumerate()
                .map(|(i, word)| SpeechMark {
                    mark_type: "word".to_string(),
                    value: word.to_string(),
                    time: (i as u64) * 400,
                    duration: Some(350),
                })
                .collect())
        }

        async fn synthesize_audio(&self, _text: &str) -> Result<Vec<u8>> {
            self.audio_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0u8; 128])
        }
    }

    #[tokio::test]
    async fn test_generate_voiceover_writes_bundle_files() {
        let dir = tempfile::tempdir().unwrap();
        let synth = FakeSynthesizer::new();

        let voiceover = generate_voiceover(&synth, "hello brave new world", 2, dir.path(), 300)
            .await
            .unwrap();

        assert_eq!(synth.mark_calls.load(Ordering::SeqCst), 1);
        assert_eq!(synth.audio_calls.load(Ordering::SeqCst), 1);

        assert!(dir.path().join("voice-2.mp3").exists());
        let timing_json = std::fs::read_to_string(dir.path().join("voice-2-timing.json")).unwrap();
        let parsed: TimingTrack = serde_json::from_str(&timing_json).unwrap();
        assert_eq!(parsed.words.len(), 4);
        assert!((parsed.total_duration - voiceover.track.total_duration).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_generate_voiceover_propagates_engine_failure() {
        let dir = tempfile::tempdir().unwrap();
        let synth = FakeSynthesizer::new();

        let err = generate_voiceover(&synth, "", 1, dir.path(), 300)
            .await
            .unwrap_err();
        assert!(matches!(err, FortellError::Voice(_)));
        assert!(!dir.path().join("voice-1.mp3").exists());
    }
}
