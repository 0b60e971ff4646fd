//! Text-to-image generation.

mod openai;

pub use openai::OpenAIImageGenerator;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for text-to-image generators.
///
/// Implementations return raw image bytes; callers decide how to encode or
/// persist them.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image for the prompt and return its raw bytes (PNG).
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>>;
}

/// Append the fixed stylistic suffix to a story prompt.
pub fn styled_prompt(summary: &str, style_suffix: &str) -> String {
    if style_suffix.is_empty() {
        summary.to_string()
    } else {
        format!("{}, {}", summary.trim_end_matches('.'), style_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_styled_prompt_appends_suffix() {
        let prompt = styled_prompt("A village built a bridge.", "cinematic lighting, 8k");
        assert_eq!(prompt, "A village built a bridge, cinematic lighting, 8k");
    }

    #[test]
    fn test_styled_prompt_without_suffix() {
        assert_eq!(styled_prompt("A fox.", ""), "A fox.");
    }
}
