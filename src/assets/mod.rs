//! Story bundles: the per-job working directories handed between the
//! summarize and build-video stages.
//!
//! A bundle holds `story-{i}.txt`, `image-{i}.png`, `voice-{i}.mp3` and
//! `voice-{i}-timing.json` for i in 1..=3, plus `metadata.json`. The bundle
//! *name* is the only token returned to the caller; it is resolved back to a
//! path server-side, and the recorded owner is checked before the build-video
//! stage will touch it.

use crate::error::{FortellError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Subdirectory of the bundle root where failed publishes are parked.
pub const DEAD_LETTER_DIR: &str = "failed";

/// Metadata recorded when a bundle is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleMetadata {
    /// Source URL the stories were derived from.
    pub url: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Number of story segments in the bundle.
    pub story_count: usize,
    /// User who requested the summarize job that produced this bundle.
    pub owner: String,
}

/// A story bundle on disk.
#[derive(Debug, Clone)]
pub struct StoryBundle {
    /// Opaque bundle name; the capability token returned to the caller.
    pub name: String,
    /// Absolute path of the bundle directory.
    pub path: PathBuf,
    pub metadata: BundleMetadata,
}

impl StoryBundle {
    pub fn story_path(&self, index: usize) -> PathBuf {
        self.path.join(format!("story-{}.txt", index))
    }

    pub fn image_path(&self, index: usize) -> PathBuf {
        self.path.join(format!("image-{}.png", index))
    }

    pub fn voice_path(&self, index: usize) -> PathBuf {
        self.path.join(format!("voice-{}.mp3", index))
    }

    pub fn timing_path(&self, index: usize) -> PathBuf {
        self.path.join(format!("voice-{}-timing.json", index))
    }
}

/// Create a fresh, uniquely-named bundle and persist stories, images and
/// metadata into it.
#[instrument(skip(stories, images), fields(url = %url, owner = %owner))]
pub fn create_bundle(
    base_dir: &Path,
    owner: &str,
    url: &str,
    stories: &[String],
    images: &[Vec<u8>],
) -> Result<StoryBundle> {
    if stories.len() != images.len() {
        return Err(FortellError::InvalidInput(format!(
            "Story/image count mismatch: {} vs {}",
            stories.len(),
            images.len()
        )));
    }

    std::fs::create_dir_all(base_dir)?;

    let name = Uuid::new_v4().simple().to_string();
    let path = base_dir.join(&name);
    std::fs::create_dir(&path)?;

    for (i, story) in stories.iter().enumerate() {
        std::fs::write(path.join(format!("story-{}.txt", i + 1)), story)?;
    }

    for (i, image) in images.iter().enumerate() {
        std::fs::write(path.join(format!("image-{}.png", i + 1)), image)?;
    }

    let metadata = BundleMetadata {
        url: url.to_string(),
        timestamp: Utc::now(),
        story_count: stories.len(),
        owner: owner.to_string(),
    };
    std::fs::write(
        path.join("metadata.json"),
        serde_json::to_string_pretty(&metadata)?,
    )?;

    info!("Created story bundle {}", name);

    Ok(StoryBundle {
        name,
        path,
        metadata,
    })
}

/// Validate a bundle token before it touches the filesystem.
///
/// Tokens are bare directory names; anything that could traverse out of the
/// bundle root is rejected.
pub fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(FortellError::InvalidInput("Bundle name is required".into()));
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(FortellError::InvalidInput(format!(
            "Invalid bundle name: {}",
            token
        )));
    }
    Ok(())
}

/// Resolve a bundle token to a directory, verify ownership and check that the
/// full asset set required by the video composer is present.
#[instrument(skip(base_dir))]
pub fn open_bundle(base_dir: &Path, token: &str, expected_owner: &str) -> Result<StoryBundle> {
    validate_token(token)?;

    let path = base_dir.join(token);
    if !path.is_dir() {
        return Err(FortellError::BundleNotFound(token.to_string()));
    }

    let metadata_raw = std::fs::read_to_string(path.join("metadata.json"))
        .map_err(|_| FortellError::BundleNotFound(token.to_string()))?;
    let metadata: BundleMetadata = serde_json::from_str(&metadata_raw)?;

    if metadata.owner != expected_owner {
        return Err(FortellError::NotBundleOwner(token.to_string()));
    }

    let bundle = StoryBundle {
        name: token.to_string(),
        path,
        metadata,
    };

    for i in 1..=bundle.metadata.story_count {
        for required in [
            bundle.image_path(i),
            bundle.voice_path(i),
            bundle.timing_path(i),
        ] {
            if !required.is_file() {
                return Err(FortellError::InvalidInput(format!(
                    "Bundle {} is missing {}",
                    token,
                    required
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default()
                )));
            }
        }
    }

    Ok(bundle)
}

/// Remove a bundle directory and everything in it.
pub fn remove_bundle(bundle: &StoryBundle) -> Result<()> {
    std::fs::remove_dir_all(&bundle.path)?;
    info!("Removed story bundle {}", bundle.name);
    Ok(())
}

/// Park a bundle under the dead-letter directory after a failed publish.
///
/// The bundle keeps its name, so a later manual retry can find it.
pub fn quarantine_bundle(base_dir: &Path, bundle: &StoryBundle) -> Result<PathBuf> {
    let dead_letter = base_dir.join(DEAD_LETTER_DIR);
    std::fs::create_dir_all(&dead_letter)?;

    let target = dead_letter.join(&bundle.name);
    std::fs::rename(&bundle.path, &target)?;

    warn!("Parked story bundle {} in {}", bundle.name, DEAD_LETTER_DIR);
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_assets() -> (Vec<String>, Vec<Vec<u8>>) {
        let stories = vec![
            "First story.".to_string(),
            "Second story.".to_string(),
            "Third story.".to_string(),
        ];
        let images = vec![vec![1u8; 8], vec![2u8; 8], vec![3u8; 8]];
        (stories, images)
    }

    fn fill_voice_files(bundle: &StoryBundle) {
        for i in 1..=3 {
            std::fs::write(bundle.voice_path(i), b"mp3").unwrap();
            std::fs::write(
                bundle.timing_path(i),
                r#"{"words":[],"totalDuration":0.0}"#,
            )
            .unwrap();
        }
    }

    #[test]
    fn test_create_bundle_layout() {
        let base = tempfile::tempdir().unwrap();
        let (stories, images) = sample_assets();

        let bundle =
            create_bundle(base.path(), "user-1", "https://example.com", &stories, &images).unwrap();

        for i in 1..=3 {
            assert!(bundle.story_path(i).is_file());
            assert!(bundle.image_path(i).is_file());
        }
        let metadata: BundleMetadata = serde_json::from_str(
            &std::fs::read_to_string(bundle.path.join("metadata.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(metadata.story_count, 3);
        assert_eq!(metadata.owner, "user-1");
        assert_eq!(metadata.url, "https://example.com");
    }

    #[test]
    fn test_token_validation_rejects_traversal() {
        assert!(validate_token("abc123").is_ok());
        assert!(validate_token("a-b_c").is_ok());
        assert!(validate_token("").is_err());
        assert!(validate_token("../etc").is_err());
        assert!(validate_token("a/b").is_err());
        assert!(validate_token("a\\b").is_err());
        assert!(validate_token("..").is_err());
    }

    #[test]
    fn test_open_bundle_checks_owner() {
        let base = tempfile::tempdir().unwrap();
        let (stories, images) = sample_assets();
        let bundle =
            create_bundle(base.path(), "user-1", "https://example.com", &stories, &images).unwrap();
        fill_voice_files(&bundle);

        assert!(open_bundle(base.path(), &bundle.name, "user-1").is_ok());

        let err = open_bundle(base.path(), &bundle.name, "user-2").unwrap_err();
        assert!(matches!(err, FortellError::NotBundleOwner(_)));
    }

    #[test]
    fn test_open_bundle_requires_full_asset_set() {
        let base = tempfile::tempdir().unwrap();
        let (stories, images) = sample_assets();
        let bundle =
            create_bundle(base.path(), "user-1", "https://example.com", &stories, &images).unwrap();
        // No voice files written

        let err = open_bundle(base.path(), &bundle.name, "user-1").unwrap_err();
        assert!(matches!(err, FortellError::InvalidInput(_)));
    }

    #[test]
    fn test_open_missing_bundle() {
        let base = tempfile::tempdir().unwrap();
        let err = open_bundle(base.path(), "doesnotexist", "user-1").unwrap_err();
        assert!(matches!(err, FortellError::BundleNotFound(_)));
    }

    #[test]
    fn test_quarantine_moves_bundle() {
        let base = tempfile::tempdir().unwrap();
        let (stories, images) = sample_assets();
        let bundle =
            create_bundle(base.path(), "user-1", "https://example.com", &stories, &images).unwrap();

        let parked = quarantine_bundle(base.path(), &bundle).unwrap();
        assert!(!bundle.path.exists());
        assert!(parked.is_dir());
        assert!(parked.starts_with(base.path().join(DEAD_LETTER_DIR)));
    }
}
