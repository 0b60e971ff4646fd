//! Caption filter-graph construction for the video composer.

use crate::config::VideoSettings;
use crate::voice::TimingTrack;

/// Build the full video filter chain for one clip: scale/pad the still image
/// to the output frame, burn in one timed drawtext per word, and normalize
/// the pixel format.
pub fn caption_filter(track: &TimingTrack, video: &VideoSettings) -> String {
    let mut parts = vec![format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
        w = video.width,
        h = video.height
    )];

    for word in &track.words {
        parts.push(word_drawtext(
            &word.word,
            word.start_time,
            word.end_time,
            video.font_size,
        ));
    }

    parts.push("format=yuv420p".to_string());
    parts.join(",")
}

/// One drawtext filter showing a word only inside its timing window, centered
/// horizontally at three-quarters height, white with a black outline.
fn word_drawtext(word: &str, start: f64, end: f64, font_size: u32) -> String {
    format!(
        "drawtext=text='{text}':enable='between(t,{start:.3},{end:.3})':\
         fontsize={font_size}:fontcolor=white:borderw=3:bordercolor=black:\
         x=(w-text_w)/2:y=h*3/4",
        text = escape_drawtext(word),
    )
}

/// Escape text for use inside a quoted drawtext value.
///
/// Escaping happens twice: once for the drawtext option value and once for
/// the filtergraph parser, per ffmpeg's filtergraph escaping rules.
pub fn escape_drawtext(text: &str) -> String {
    let mut first = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => first.push_str("\\\\"),
            '\'' => first.push_str("\\'"),
            ':' => first.push_str("\\:"),
            '%' => first.push_str("\\%"),
            _ => first.push(c),
        }
    }

    let mut second = String::with_capacity(first.len());
    for c in first.chars() {
        match c {
            '\\' => second.push_str("\\\\"),
            '\'' => second.push_str("\\'"),
            ',' => second.push_str("\\,"),
            ';' => second.push_str("\\;"),
            '[' => second.push_str("\\["),
            ']' => second.push_str("\\]"),
            _ => second.push(c),
        }
    }
    second
}
