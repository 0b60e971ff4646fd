//! Video composition.
//!
//! For each story segment the composer loops the still image for the length
//! of its narration, muxes the voiceover audio (codec copy), and burns in the
//! per-word caption overlay. Clips are encoded strictly one after another;
//! the concatenation step requires all three files to exist, and ffmpeg
//! process spawns are not parallelized.

mod filters;

pub use filters::{caption_filter, escape_drawtext};

use crate::assets::StoryBundle;
use crate::config::VideoSettings;
use crate::error::{FortellError, Result};
use crate::voice::TimingTrack;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Name of the concatenated output inside the bundle.
const FINAL_VIDEO_NAME: &str = "final-video.mp4";

/// Trait for clip composition backends.
#[async_trait]
pub trait Composer: Send + Sync {
    /// Render the bundle's story segments into one final video and return
    /// its path inside the bundle.
    async fn compose(&self, bundle: &StoryBundle) -> Result<PathBuf>;
}

/// Composes captioned clips with ffmpeg and concatenates them into one video.
pub struct VideoComposer {
    settings: VideoSettings,
}

impl VideoComposer {
    pub fn new(settings: VideoSettings) -> Self {
        Self { settings }
    }

    /// Encode a single captioned clip from a still image and a voiceover.
    async fn encode_clip(
        &self,
        image: &Path,
        audio: &Path,
        track: &TimingTrack,
        output: &Path,
    ) -> Result<()> {
        // A zero-length narration would make ffmpeg reject -t.
        let duration = track.total_duration.max(0.1);
        let filter = caption_filter(track, &self.settings);

        let result = Command::new("ffmpeg")
            .arg("-y")
            .arg("-loop").arg("1")
            .arg("-i").arg(image)
            .arg("-i").arg(audio)
            .arg("-t").arg(format!("{:.3}", duration))
            .arg("-vf").arg(&filter)
            .arg("-c:v").arg("libx264")
            .arg("-preset").arg(&self.settings.preset)
            .arg("-crf").arg(self.settings.crf.to_string())
            .arg("-r").arg(self.settings.fps.to_string())
            .arg("-c:a").arg("copy")
            .arg("-loglevel").arg("error")
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        check_ffmpeg_result(result, "clip encode")?;
        debug!("Encoded {}", output.display());
        Ok(())
    }

    /// Concatenate clips with the concat demuxer. All clips share one
    /// encoding profile, so the streams are copied rather than re-encoded.
    async fn concat_clips(
        &self,
        clips: &[PathBuf],
        work_dir: &Path,
        output: &Path,
    ) -> Result<()> {
        let list_path = work_dir.join("concat.txt");
        std::fs::write(&list_path, concat_list(clips))?;

        let result = Command::new("ffmpeg")
            .arg("-y")
            .arg("-f").arg("concat")
            .arg("-safe").arg("0")
            .arg("-i").arg(&list_path)
            .arg("-c").arg("copy")
            .arg("-loglevel").arg("error")
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        check_ffmpeg_result(result, "concat")?;
        Ok(())
    }
}

#[async_trait]
impl Composer for VideoComposer {
    /// Render one clip per story segment, then concatenate them.
    ///
    /// Clips are encoded strictly one after another; the concat step needs
    /// every numbered clip on disk first.
    #[instrument(skip(self, bundle), fields(bundle = %bundle.name))]
    async fn compose(&self, bundle: &StoryBundle) -> Result<PathBuf> {
        let mut clips = Vec::with_capacity(bundle.metadata.story_count);

        for i in 1..=bundle.metadata.story_count {
            let track = read_timing(&bundle.timing_path(i))?;
            let clip_path = bundle.path.join(format!("clip-{}.mp4", i));

            info!("Encoding clip {} ({:.3}s)", i, track.total_duration);
            self.encode_clip(
                &bundle.image_path(i),
                &bundle.voice_path(i),
                &track,
                &clip_path,
            )
            .await?;

            clips.push(clip_path);
        }

        let final_path = bundle.path.join(FINAL_VIDEO_NAME);
        self.concat_clips(&clips, &bundle.path, &final_path).await?;

        info!("Composed final video at {}", final_path.display());
        Ok(final_path)
    }
}

/// Render the concat demuxer file list.
fn concat_list(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|clip| format!("file '{}'\n", clip.display()))
        .collect()
}

fn read_timing(path: &Path) -> Result<TimingTrack> {
    let raw = std::fs::read_to_string(path)?;
    let track: TimingTrack = serde_json::from_str(&raw)?;
    Ok(track)
}

fn check_ffmpeg_result(
    result: std::io::Result<std::process::Output>,
    stage: &str,
) -> Result<()> {
    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let stderr = String::from_utf8_lossy(&out.stderr);
            Err(FortellError::Video(format!("{} failed: {}", stage, stderr)))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(FortellError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(FortellError::Video(format!("{} error: {}", stage, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_list_format() {
        let clips = vec![
            PathBuf::from("/work/clip-1.mp4"),
            PathBuf::from("/work/clip-2.mp4"),
            PathBuf::from("/work/clip-3.mp4"),
        ];
        let list = concat_list(&clips);
        assert_eq!(
            list,
            "file '/work/clip-1.mp4'\nfile '/work/clip-2.mp4'\nfile '/work/clip-3.mp4'\n"
        );
    }

    #[test]
    fn test_read_timing_parses_bundle_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice-1-timing.json");
        std::fs::write(
            &path,
            r#"{
                "words": [
                    {"word": "hi", "startTime": 0.0, "endTime": 0.4, "duration": 0.4}
                ],
                "totalDuration": 0.4
            }"#,
        )
        .unwrap();

        let track = read_timing(&path).unwrap();
        assert_eq!(track.words.len(), 1);
        assert!((track.total_duration - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_read_timing_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_timing(&dir.path().join("nope.json")).is_err());
    }
}
