//! Word timing derivation from speech marks.

use super::SpeechMark;
use serde::{Deserialize, Serialize};

/// Timing for one narrated word.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingMark {
    pub word: String,
    /// Seconds from the start of the narration.
    pub start_time: f64,
    /// Seconds from the start of the narration.
    pub end_time: f64,
    /// `end_time - start_time`, in seconds.
    pub duration: f64,
}

/// The full timing track for one narration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingTrack {
    pub words: Vec<TimingMark>,
    /// End of the last word, in seconds.
    pub total_duration: f64,
}

/// Derive word timings from engine speech marks.
///
/// Only `word` marks are considered. Each word ends where the next one
/// starts; the last word ends at `start + duration`, falling back to
/// `last_word_fallback_ms` when the engine reported no duration. All times
/// are rounded to millisecond precision.
pub fn build_timing(marks: &[SpeechMark], last_word_fallback_ms: u64) -> TimingTrack {
    let word_marks: Vec<&SpeechMark> = marks.iter().filter(|m| m.mark_type == "word").collect();

    let words: Vec<TimingMark> = word_marks
        .iter()
        .enumerate()
        .map(|(i, mark)| {
            let start_time = round_ms(mark.time as f64 / 1000.0);
            let end_time = match word_marks.get(i + 1) {
                Some(next) => round_ms(next.time as f64 / 1000.0),
                None => round_ms(
                    (mark.time + mark.duration.unwrap_or(last_word_fallback_ms)) as f64 / 1000.0,
                ),
            };
            TimingMark {
                word: mark.value.clone(),
                start_time,
                end_time,
                duration: round_ms(end_time - start_time),
            }
        })
        .collect();

    let total_duration = words.last().map(|w| w.end_time).unwrap_or(0.0);

    TimingTrack {
        words,
        total_duration,
    }
}

fn round_ms(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(kind: &str, value: &str, time: u64, duration: Option<u64>) -> SpeechMark {
        SpeechMark {
            mark_type: kind.to_string(),
            value: value.to_string(),
            time,
            duration,
        }
    }

    #[test]
    fn test_end_time_is_next_start() {
        let track = build_timing(
            &[
                mark("word", "one", 0, Some(200)),
                mark("word", "two", 450, Some(300)),
                mark("word", "three", 900, Some(250)),
            ],
            300,
        );

        assert_eq!(track.words.len(), 3);
        assert!((track.words[0].end_time - 0.45).abs() < 1e-9);
        assert!((track.words[1].end_time - 0.9).abs() < 1e-9);
        // Last word: start + reported duration
        assert!((track.words[2].end_time - 1.15).abs() < 1e-9);
        assert!((track.total_duration - 1.15).abs() < 1e-9);
    }

    #[test]
    fn test_last_word_fallback_duration() {
        let track = build_timing(&[mark("word", "solo", 1000, None)], 300);
        assert!((track.words[0].start_time - 1.0).abs() < 1e-9);
        assert!((track.words[0].end_time - 1.3).abs() < 1e-9);
        assert!((track.total_duration - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_non_word_marks_filtered() {
        let track = build_timing(
            &[
                mark("sentence", "one two", 0, None),
                mark("word", "one", 0, Some(100)),
                mark("ssml", "<s>", 50, None),
                mark("word", "two", 300, Some(100)),
            ],
            300,
        );
        assert_eq!(track.words.len(), 2);
        assert_eq!(track.words[0].word, "one");
        assert_eq!(track.words[1].word, "two");
    }

    #[test]
    fn test_round_trip_invariant() {
        let marks: Vec<SpeechMark> = (0..10)
            .map(|i| mark("word", &format!("w{}", i), i * 333, Some(250)))
            .collect();
        let track = build_timing(&marks, 300);

        for pair in track.words.windows(2) {
            assert!((pair[0].end_time - pair[1].start_time).abs() < 1e-9);
        }
        let last = track.words.last().unwrap();
        assert!((last.end_time - (last.start_time + last.duration)).abs() < 1e-9);
        assert!((track.total_duration - last.end_time).abs() < 1e-9);
    }

    #[test]
    fn test_empty_marks() {
        let track = build_timing(&[], 300);
        assert!(track.words.is_empty());
        assert_eq!(track.total_duration, 0.0);
    }

    #[test]
    fn test_millisecond_rounding() {
        let track = build_timing(&[mark("word", "x", 1, Some(1))], 300);
        assert_eq!(track.words[0].start_time, 0.001);
        assert_eq!(track.words[0].end_time, 0.002);
        assert_eq!(track.words[0].duration, 0.001);
    }

    #[test]
    fn test_serialized_field_names() {
        let track = build_timing(&[mark("word", "x", 0, Some(100))], 300);
        let json = serde_json::to_string(&track).unwrap();
        assert!(json.contains("\"startTime\""));
        assert!(json.contains("\"endTime\""));
        assert!(json.contains("\"totalDuration\""));
    }
}
