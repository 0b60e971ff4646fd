//! OpenAI images-API generator.

use super::ImageGenerator;
use crate::error::{FortellError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    CreateImageRequestArgs, Image, ImageModel, ImageResponseFormat, ImageSize,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::time::Duration;
use tracing::{debug, instrument};

/// Image generator backed by the OpenAI images API.
pub struct OpenAIImageGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: ImageModel,
    size: ImageSize,
}

impl OpenAIImageGenerator {
    /// Create a generator; the timeout bounds each individual image call.
    pub fn new(model: &str, size: &str, timeout_seconds: u64) -> Self {
        let model = match model {
            "dall-e-2" => ImageModel::DallE2,
            "dall-e-3" => ImageModel::DallE3,
            other => ImageModel::Other(other.to_string()),
        };
        let size = match size {
            "256x256" => ImageSize::S256x256,
            "512x512" => ImageSize::S512x512,
            "1792x1024" => ImageSize::S1792x1024,
            "1024x1792" => ImageSize::S1024x1792,
            _ => ImageSize::S1024x1024,
        };

        Self {
            client: create_client_with_timeout(Duration::from_secs(timeout_seconds)),
            model,
            size,
        }
    }
}

#[async_trait]
impl ImageGenerator for OpenAIImageGenerator {
    #[instrument(skip(self, prompt))]
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        let request = CreateImageRequestArgs::default()
            .prompt(prompt)
            .model(self.model.clone())
            .size(self.size)
            .response_format(ImageResponseFormat::B64Json)
            .n(1)
            .build()
            .map_err(|e| FortellError::Image(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .images()
            .create(request)
            .await
            .map_err(|e| FortellError::OpenAI(format!("Image API error: {}", e)))?;

        let image = response
            .data
            .first()
            .ok_or_else(|| FortellError::Image("Empty image response".to_string()))?;

        let b64 = match image.as_ref() {
            Image::B64Json { b64_json, .. } => b64_json.as_str(),
            _ => {
                return Err(FortellError::Image(
                    "Expected base64 image payload".to_string(),
                ))
            }
        };

        let bytes = BASE64
            .decode(b64)
            .map_err(|e| FortellError::Image(format!("Invalid base64 payload: {}", e)))?;

        debug!("Generated image: {} bytes", bytes.len());
        Ok(bytes)
    }
}
