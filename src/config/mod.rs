//! Configuration module for Fortell.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts, SummaryPrompts};
pub use settings::{
    ChunkingSettings, CreditSettings, EmbeddingSettings, GeneralSettings, ImageSettings,
    RagSettings, ScrapeSettings, Settings, StorageSettings, SummarySettings, VectorStoreSettings,
    VideoSettings, VoiceSettings,
};
