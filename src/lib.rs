//! Fortell - Article-to-Video and RAG
//!
//! Turn web articles into narrated, captioned short videos and chat with the
//! scraped content through retrieval-augmented generation.
//!
//! The name "Fortell" comes from the Norwegian word for "tell."
//!
//! # Overview
//!
//! Fortell allows you to:
//! - Scrape an article and compress it into three narrated story segments
//! - Render each segment as a captioned video clip and publish the result
//! - Build a searchable vector index from the scraped text
//! - Chat with indexed articles, scoped per document
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `scrape` - Headless-browser page scraping
//! - `chunking` - Story segmentation and index chunking
//! - `llm` - Text generation abstraction
//! - `summary` - Chunk summarization
//! - `image` - Text-to-image generation
//! - `voice` - Neural TTS voiceovers with word timing
//! - `assets` - Story bundle persistence
//! - `video` - Clip composition and concatenation
//! - `publish` - Object storage publishing
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `index` - Retrieval index operations
//! - `rag` - RAG chat orchestration
//! - `credits` - Credit accounting
//! - `orchestrator` - Pipeline coordination
//! - `server` - HTTP API
//!
//! # Example
//!
//! ```rust,no_run
//! use fortell::config::Settings;
//! use fortell::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     // Turn an article into three narrated stories
//!     let result = orchestrator
//!         .summarize_url("local", "https://example.com/article")
//!         .await?;
//!     println!("Bundle ready: {}", result.stories_dir);
//!
//!     // Compose and publish the video
//!     let video = orchestrator.build_video("local", &result.stories_dir).await?;
//!     println!("Published: {}", video.video_url);
//!
//!     Ok(())
//! }
//! ```

pub mod assets;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod credits;
pub mod embedding;
pub mod error;
pub mod image;
pub mod index;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod publish;
pub mod rag;
pub mod scrape;
pub mod server;
pub mod summary;
pub mod vector_store;
pub mod video;
pub mod voice;

pub use error::{FortellError, Result};
