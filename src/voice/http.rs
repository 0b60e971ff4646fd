//! HTTP client for a neural TTS service.
//!
//! The service exposes one synthesis endpoint; the output format selects
//! between newline-delimited JSON speech marks and an MP3 stream. Marks and
//! audio for the same text are two independent synthesis passes.

use super::{SpeechMark, SpeechSynthesizer};
use crate::config::VoiceSettings;
use crate::error::{FortellError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Client for a Polly-style neural TTS HTTP service.
pub struct NeuralTtsClient {
    http: reqwest::Client,
    endpoint: String,
    voice_id: String,
    language_code: String,
    engine: String,
}

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
    language_code: &'a str,
    engine: &'a str,
    output_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_mark_types: Option<&'a [&'a str]>,
}

impl NeuralTtsClient {
    pub fn new(settings: &VoiceSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| FortellError::Voice(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            voice_id: settings.voice_id.clone(),
            language_code: settings.language_code.clone(),
            engine: settings.engine.clone(),
        })
    }

    fn synthesize_url(&self) -> String {
        format!("{}/v1/synthesize", self.endpoint)
    }

    async fn post_synthesize(&self, request: &SynthesizeRequest<'_>) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(self.synthesize_url())
            .json(request)
            .send()
            .await
            .map_err(|e| FortellError::Voice(format!("TTS request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FortellError::Voice(format!(
                "TTS service returned {}: {}",
                status, body
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl SpeechSynthesizer for NeuralTtsClient {
    #[instrument(skip(self, text))]
    async fn synthesize_marks(&self, text: &str) -> Result<Vec<SpeechMark>> {
        let request = SynthesizeRequest {
            text,
            voice_id: &self.voice_id,
            language_code: &self.language_code,
            engine: &self.engine,
            output_format: "json",
            speech_mark_types: Some(&["word"]),
        };

        let body = self.post_synthesize(&request).await?.text().await?;
        let marks = parse_mark_lines(&body)?;

        debug!("Received {} speech marks", marks.len());
        Ok(marks)
    }

    #[instrument(skip(self, text))]
    async fn synthesize_audio(&self, text: &str) -> Result<Vec<u8>> {
        let request = SynthesizeRequest {
            text,
            voice_id: &self.voice_id,
            language_code: &self.language_code,
            engine: &self.engine,
            output_format: "mp3",
            speech_mark_types: None,
        };

        let bytes = self.post_synthesize(&request).await?.bytes().await?;
        if bytes.is_empty() {
            return Err(FortellError::Voice("TTS service returned no audio".into()));
        }

        debug!("Received {} audio bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Parse newline-delimited JSON speech marks.
fn parse_mark_lines(body: &str) -> Result<Vec<SpeechMark>> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str::<SpeechMark>(line)
                .map_err(|e| FortellError::Voice(format!("Invalid speech mark '{}': {}", line, e)))
        })
        .collect()
}
