//! Pipeline orchestrator for Fortell.
//!
//! Coordinates the two core workflows: turning a URL into a story bundle
//! (scrape, chunk, summarize, index, images, voiceovers) and turning a story
//! bundle into a published video (compose, publish). Credit checks happen
//! before any paid work; deduction happens only after success.

use crate::assets::{self, StoryBundle};
use crate::chunking::{split_into_stories, StoryChunk, STORY_COUNT};
use crate::config::{Prompts, Settings};
use crate::credits::{ensure_balance, CreditLedger, SqliteCreditLedger};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{FortellError, Result};
use crate::image::{styled_prompt, ImageGenerator, OpenAIImageGenerator};
use crate::index::{doc_id_for_url, RagStore};
use crate::llm::{OpenAIGenerator, TextGenerator};
use crate::publish::{HttpObjectStorage, Publisher};
use crate::scrape::{HeadlessScraper, Scraper};
use crate::summary::Summarizer;
use crate::vector_store::SqliteVectorStore;
use crate::video::{Composer, VideoComposer};
use crate::voice::{generate_voiceover, NeuralTtsClient, SpeechSynthesizer};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::future::try_join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// The main orchestrator for the Fortell pipelines.
pub struct Orchestrator {
    settings: Settings,
    scraper: Arc<dyn Scraper>,
    summarizer: Summarizer,
    image_generator: Arc<dyn ImageGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    composer: Arc<dyn Composer>,
    publisher: Publisher,
    rag_store: Arc<RagStore>,
    ledger: Arc<dyn CreditLedger>,
    stories_dir: PathBuf,
}

impl Orchestrator {
    /// Create a new orchestrator with the default component stack.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(None, None)?;

        let generator: Arc<dyn TextGenerator> = Arc::new(
            OpenAIGenerator::new(&settings.summary.model, settings.summary.timeout_seconds)
                .with_temperature(settings.summary.temperature)
                .with_max_tokens(settings.summary.max_tokens),
        );
        let summarizer = Summarizer::new(generator, prompts, settings.summary.max_words);

        let scraper: Arc<dyn Scraper> = Arc::new(HeadlessScraper::new(
            &settings.scrape.browser_binary,
            settings.scrape.timeout_seconds,
        ));

        let image_generator: Arc<dyn ImageGenerator> = Arc::new(OpenAIImageGenerator::new(
            &settings.image.model,
            &settings.image.size,
            settings.image.timeout_seconds,
        ));

        let synthesizer: Arc<dyn SpeechSynthesizer> =
            Arc::new(NeuralTtsClient::new(&settings.voice)?);

        let composer: Arc<dyn Composer> = Arc::new(VideoComposer::new(settings.video.clone()));

        let publisher = Publisher::new(Arc::new(HttpObjectStorage::new(&settings.storage)?));

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));
        let vector_store = Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?);
        let rag_store = Arc::new(RagStore::new(
            vector_store,
            embedder,
            settings.chunking.index_chunk_chars,
            settings.chunking.index_chunk_overlap,
            settings.rag.search_k,
        ));

        let ledger: Arc<dyn CreditLedger> =
            Arc::new(SqliteCreditLedger::new(&settings.sqlite_path())?);

        let stories_dir = settings.stories_dir();
        std::fs::create_dir_all(&stories_dir)?;

        Ok(Self {
            settings,
            scraper,
            summarizer,
            image_generator,
            synthesizer,
            composer,
            publisher,
            rag_store,
            ledger,
            stories_dir,
        })
    }

    /// Create an orchestrator with custom components.
    #[allow(clippy::too_many_arguments)]
    pub fn with_components(
        settings: Settings,
        scraper: Arc<dyn Scraper>,
        summarizer: Summarizer,
        image_generator: Arc<dyn ImageGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        composer: Arc<dyn Composer>,
        publisher: Publisher,
        rag_store: Arc<RagStore>,
        ledger: Arc<dyn CreditLedger>,
    ) -> Result<Self> {
        let stories_dir = settings.stories_dir();
        std::fs::create_dir_all(&stories_dir)?;

        Ok(Self {
            settings,
            scraper,
            summarizer,
            image_generator,
            synthesizer,
            composer,
            publisher,
            rag_store,
            ledger,
            stories_dir,
        })
    }

    /// Get a reference to the retrieval index.
    pub fn rag_store(&self) -> Arc<RagStore> {
        self.rag_store.clone()
    }

    /// Get a reference to the credit ledger.
    pub fn ledger(&self) -> Arc<dyn CreditLedger> {
        self.ledger.clone()
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the summarize pipeline: scrape, chunk, summarize + index, render
    /// images, persist the bundle, synthesize voiceovers.
    #[instrument(skip(self), fields(user = %user_id, url = %url))]
    pub async fn summarize_url(&self, user_id: &str, url: &str) -> Result<SummarizeResult> {
        if url.trim().is_empty() {
            return Err(FortellError::InvalidInput("URL is required".into()));
        }

        let cost = self.settings.credits.summarize_cost;
        let user = self.ledger.get_user(user_id).await?;
        ensure_balance(&user, cost)?;

        info!("Scraping source document");
        let text = self.scraper.scrape(url).await?;
        let doc_id = doc_id_for_url(url);

        let chunks = split_into_stories(
            &text,
            self.settings.chunking.equal_split_threshold,
            self.settings.chunking.window_words,
        );

        // Summaries fan out concurrently while the scraped text is indexed;
        // one failed chunk fails the whole batch.
        info!("Summarizing {} chunks and indexing document", chunks.len());
        let (summaries, chunks_indexed) = tokio::try_join!(
            self.summarize_chunks(&chunks),
            self.rag_store.add_document(&doc_id, &text, url),
        )?;

        info!("Generating {} images", summaries.len());
        let images = try_join_all(summaries.iter().map(|summary| {
            let prompt = styled_prompt(summary, &self.settings.image.style_suffix);
            let generator = self.image_generator.clone();
            async move { generator.generate(&prompt).await }
        }))
        .await?;

        let bundle = assets::create_bundle(&self.stories_dir, user_id, url, &summaries, &images)?;

        info!("Synthesizing {} voiceovers", summaries.len());
        try_join_all(summaries.iter().enumerate().map(|(i, summary)| {
            generate_voiceover(
                self.synthesizer.as_ref(),
                summary,
                i + 1,
                &bundle.path,
                self.settings.voice.last_word_fallback_ms,
            )
        }))
        .await?;

        let credit_balance = self.ledger.deduct(user_id, cost).await?;

        Ok(SummarizeResult {
            doc_id,
            stories_dir: bundle.name,
            summaries,
            chunks_indexed,
            credit_balance,
        })
    }

    /// All chunk summaries as one fail-fast batch.
    async fn summarize_chunks(&self, chunks: &[StoryChunk]) -> Result<Vec<String>> {
        debug_assert_eq!(chunks.len(), STORY_COUNT);
        try_join_all(chunks.iter().map(|chunk| self.summarizer.summarize(chunk))).await
    }

    /// Run the build-video pipeline on an existing story bundle.
    ///
    /// The token must name a bundle owned by the requesting user. On success
    /// the bundle is gone and the video is published; on a failed upload the
    /// bundle is parked for retry.
    #[instrument(skip(self), fields(user = %user_id, bundle = %dir_token))]
    pub async fn build_video(&self, user_id: &str, dir_token: &str) -> Result<BuildVideoResult> {
        if dir_token.trim().is_empty() {
            return Err(FortellError::InvalidInput("Bundle name is required".into()));
        }

        let cost = self.settings.credits.build_video_cost;
        let user = self.ledger.get_user(user_id).await?;
        ensure_balance(&user, cost)?;

        let bundle = assets::open_bundle(&self.stories_dir, dir_token, user_id)?;

        let video_path = self.composer.compose(&bundle).await?;
        let video_url = self
            .publisher
            .publish(&bundle, &video_path, &self.stories_dir)
            .await?;

        let credit_balance = self.ledger.deduct(user_id, cost).await?;

        Ok(BuildVideoResult {
            video_url,
            credit_balance,
        })
    }

    /// Generate a single image from a raw prompt (no style suffix).
    #[instrument(skip(self, prompt), fields(user = %user_id))]
    pub async fn generate_image(&self, user_id: &str, prompt: &str) -> Result<ImageResult> {
        if prompt.trim().is_empty() {
            return Err(FortellError::InvalidInput("Prompt is required".into()));
        }

        let cost = self.settings.credits.image_cost;
        let user = self.ledger.get_user(user_id).await?;
        ensure_balance(&user, cost)?;

        let bytes = self.image_generator.generate(prompt).await?;
        let data_url = format!("data:image/png;base64,{}", BASE64.encode(&bytes));

        let credit_balance = self.ledger.deduct(user_id, cost).await?;

        Ok(ImageResult {
            image: data_url,
            credit_balance,
        })
    }

    /// Load a bundle for inspection (owner-checked).
    pub fn open_bundle(&self, user_id: &str, dir_token: &str) -> Result<StoryBundle> {
        assets::open_bundle(&self.stories_dir, dir_token, user_id)
    }
}

/// Result of the summarize pipeline.
#[derive(Debug)]
pub struct SummarizeResult {
    /// Deterministic document ID derived from the URL.
    pub doc_id: String,
    /// Bundle token to pass to build-video.
    pub stories_dir: String,
    /// The three story summaries.
    pub summaries: Vec<String>,
    /// Retrieval index chunks written for this document.
    pub chunks_indexed: usize,
    /// Balance after deduction.
    pub credit_balance: i64,
}

/// Result of the build-video pipeline.
#[derive(Debug)]
pub struct BuildVideoResult {
    pub video_url: String,
    pub credit_balance: i64,
}

/// Result of standalone image generation.
#[derive(Debug)]
pub struct ImageResult {
    /// Data-URL encoded PNG.
    pub image: String,
    pub credit_balance: i64,
}
