//! Publishing composed videos to object storage.
//!
//! The bundle is only destroyed after the upload is confirmed; a failed
//! upload parks the bundle in the dead-letter directory so the composed
//! material survives for a manual retry.

use crate::assets::{self, StoryBundle};
use crate::config::StorageSettings;
use crate::error::{FortellError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Trait for object storage backends.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload a local file under `key` and return its public URL.
    async fn upload(&self, local_path: &Path, key: &str) -> Result<String>;
}

/// Object storage over plain HTTP: objects are PUT to `{endpoint}/{key}` and
/// served from `{public_base}/{key}`.
pub struct HttpObjectStorage {
    http: reqwest::Client,
    endpoint: String,
    public_base: String,
}

impl HttpObjectStorage {
    pub fn new(settings: &StorageSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| FortellError::Publish(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            public_base: settings.public_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    #[instrument(skip(self, local_path), fields(key = %key))]
    async fn upload(&self, local_path: &Path, key: &str) -> Result<String> {
        let bytes = tokio::fs::read(local_path).await?;

        let response = self
            .http
            .put(format!("{}/{}", self.endpoint, key))
            .header("content-type", "video/mp4")
            .body(bytes)
            .send()
            .await
            .map_err(|e| FortellError::Publish(format!("Upload request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FortellError::Publish(format!(
                "Storage returned {}: {}",
                status, body
            )));
        }

        Ok(format!("{}/{}", self.public_base, key))
    }
}

/// Uploads the final video and settles the bundle's fate.
pub struct Publisher {
    storage: Arc<dyn ObjectStorage>,
}

impl Publisher {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Upload the composed video, then remove the bundle on success or park
    /// it under the dead-letter directory on failure.
    #[instrument(skip(self, bundle, video_path, base_dir), fields(bundle = %bundle.name))]
    pub async fn publish(
        &self,
        bundle: &StoryBundle,
        video_path: &Path,
        base_dir: &Path,
    ) -> Result<String> {
        let key = format!("{}.mp4", bundle.name);

        match self.storage.upload(video_path, &key).await {
            Ok(url) => {
                if let Err(e) = assets::remove_bundle(bundle) {
                    warn!("Published but failed to remove bundle {}: {}", bundle.name, e);
                }
                info!("Published {}", url);
                Ok(url)
            }
            Err(e) => {
                if let Err(park_err) = assets::quarantine_bundle(base_dir, bundle) {
                    warn!(
                        "Upload failed and bundle {} could not be parked: {}",
                        bundle.name, park_err
                    );
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{create_bundle, DEAD_LETTER_DIR};

    struct FakeStorage {
        fail: bool,
    }

    #[async_trait]
    impl ObjectStorage for FakeStorage {
        async fn upload(&self, local_path: &Path, key: &str) -> Result<String> {
            assert!(local_path.exists());
            if self.fail {
                Err(FortellError::Publish("storage unavailable".into()))
            } else {
                Ok(format!("https://cdn.example.com/{}", key))
            }
        }
    }

    fn bundle_with_video(base: &Path) -> (StoryBundle, std::path::PathBuf) {
        let stories = vec!["A.".to_string(), "B.".to_string(), "C.".to_string()];
        let images = vec![vec![0u8; 4]; 3];
        let bundle = create_bundle(base, "user-1", "https://example.com", &stories, &images).unwrap();
        let video = bundle.path.join("final-video.mp4");
        std::fs::write(&video, b"video").unwrap();
        (bundle, video)
    }

    #[tokio::test]
    async fn test_publish_success_removes_bundle() {
        let base = tempfile::tempdir().unwrap();
        let (bundle, video) = bundle_with_video(base.path());

        let publisher = Publisher::new(Arc::new(FakeStorage { fail: false }));
        let url = publisher.publish(&bundle, &video, base.path()).await.unwrap();

        assert_eq!(url, format!("https://cdn.example.com/{}.mp4", bundle.name));
        assert!(!bundle.path.exists());
    }

    #[tokio::test]
    async fn test_publish_failure_parks_bundle() {
        let base = tempfile::tempdir().unwrap();
        let (bundle, video) = bundle_with_video(base.path());

        let publisher = Publisher::new(Arc::new(FakeStorage { fail: true }));
        let err = publisher.publish(&bundle, &video, base.path()).await.unwrap_err();

        assert!(matches!(err, FortellError::Publish(_)));
        assert!(!bundle.path.exists());
        assert!(base
            .path()
            .join(DEAD_LETTER_DIR)
            .join(&bundle.name)
            .is_dir());
    }
}
