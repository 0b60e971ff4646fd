//! Configuration settings for Fortell.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub scrape: ScrapeSettings,
    pub chunking: ChunkingSettings,
    pub summary: SummarySettings,
    pub image: ImageSettings,
    pub voice: VoiceSettings,
    pub video: VideoSettings,
    pub storage: StorageSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub rag: RagSettings,
    pub credits: CreditSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Base directory for story bundles (the per-job working directories).
    pub stories_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.fortell".to_string(),
            stories_dir: "~/.fortell/stories".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Web scraping settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    /// Headless browser binary (chromium, chromium-browser, google-chrome).
    pub browser_binary: String,
    /// Timeout for a scrape in seconds.
    pub timeout_seconds: u64,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            browser_binary: "chromium".to_string(),
            timeout_seconds: 60,
        }
    }
}

/// Chunking settings, both for story segmentation and index chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Word-count threshold below which the text is split into three
    /// equal partitions; above it, three fixed windows are taken.
    pub equal_split_threshold: usize,
    /// Window size in words for long texts.
    pub window_words: usize,
    /// Character size of retrieval-index chunks.
    pub index_chunk_chars: usize,
    /// Character overlap between consecutive index chunks.
    pub index_chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            equal_split_threshold: 15000,
            window_words: 5000,
            index_chunk_chars: 1000,
            index_chunk_overlap: 200,
        }
    }
}

/// Summary generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    /// Chat model used to compress chunks into narrative summaries.
    pub model: String,
    /// Hard word budget per summary.
    pub max_words: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on completion tokens.
    pub max_tokens: u32,
    /// Timeout for a single summary call in seconds.
    pub timeout_seconds: u64,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_words: 50,
            temperature: 0.6,
            max_tokens: 100,
            timeout_seconds: 60,
        }
    }
}

/// Image generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Image model.
    pub model: String,
    /// Output size, e.g. "1024x1024".
    pub size: String,
    /// Stylistic suffix appended to every prompt.
    pub style_suffix: String,
    /// Timeout for a single image call in seconds.
    pub timeout_seconds: u64,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            model: "dall-e-3".to_string(),
            size: "1024x1024".to_string(),
            style_suffix: "hyper-realistic, cinematic lighting, ultra-detailed, 8k".to_string(),
            timeout_seconds: 60,
        }
    }
}

/// Neural text-to-speech settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Base URL of the TTS service.
    pub endpoint: String,
    /// Voice identifier.
    pub voice_id: String,
    /// Locale for synthesis.
    pub language_code: String,
    /// Synthesis engine.
    pub engine: String,
    /// Duration in milliseconds assumed for the last word when the engine
    /// reports none.
    pub last_word_fallback_ms: u64,
    /// Timeout for a single synthesis call in seconds.
    pub timeout_seconds: u64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8020".to_string(),
            voice_id: "Kajal".to_string(),
            language_code: "en-IN".to_string(),
            engine: "neural".to_string(),
            last_word_fallback_ms: 300,
            timeout_seconds: 60,
        }
    }
}

/// Video encoding settings. These mirror one fixed output profile; clips and
/// the final concatenation all use the same values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
    /// x264 constant rate factor.
    pub crf: u32,
    /// x264 preset.
    pub preset: String,
    /// Caption font size in pixels.
    pub font_size: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 24,
            crf: 28,
            preset: "ultrafast".to_string(),
            font_size: 48,
        }
    }
}

/// Object storage settings for publishing final videos.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Upload endpoint; objects are PUT to `{endpoint}/{key}`.
    pub endpoint: String,
    /// Public base URL; published videos resolve at `{public_base}/{key}`.
    pub public_base: String,
    /// Timeout for an upload in seconds.
    pub timeout_seconds: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9000/videos".to_string(),
            public_base: "http://127.0.0.1:9000/videos".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 768,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.fortell/fortell.db".to_string(),
        }
    }
}

/// RAG (Retrieval-Augmented Generation) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// LLM model for query rewriting and answer generation.
    pub model: String,
    /// Token budget for retrieved context.
    pub token_budget: usize,
    /// How many candidates each similarity search returns.
    pub search_k: usize,
    /// Maximum retained turns per chat session.
    pub max_session_turns: usize,
    /// Seconds of inactivity after which a chat session is evicted.
    pub session_ttl_seconds: u64,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            token_budget: 120_000,
            search_k: 20,
            max_session_turns: 20,
            session_ttl_seconds: 3600,
        }
    }
}

/// Fixed per-operation credit costs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditSettings {
    pub image_cost: i64,
    pub summarize_cost: i64,
    pub build_video_cost: i64,
}

impl Default for CreditSettings {
    fn default() -> Self {
        Self {
            image_cost: 1,
            summarize_cost: 2,
            build_video_cost: 2,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::FortellError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fortell")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded story bundle base directory.
    pub fn stories_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.stories_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cost_model() {
        let settings = Settings::default();
        assert_eq!(settings.credits.image_cost, 1);
        assert_eq!(settings.credits.summarize_cost, 2);
        assert_eq!(settings.credits.build_video_cost, 2);
        assert_eq!(settings.chunking.equal_split_threshold, 15000);
        assert_eq!(settings.chunking.window_words, 5000);
        assert_eq!(settings.embedding.dimensions, 768);
    }

    #[test]
    fn test_roundtrip_toml() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.video.crf, settings.video.crf);
        assert_eq!(parsed.voice.voice_id, settings.voice.voice_id);
    }
}
