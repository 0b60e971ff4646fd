//! Build-video command - compose and publish an existing story bundle.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;

/// Run the build-video pipeline from the CLI.
pub async fn run_build_video(dir: &str, user: &str, settings: Settings) -> anyhow::Result<()> {
    preflight::check(preflight::Operation::BuildVideo, &settings)?;

    let orchestrator = Orchestrator::new(settings)?;

    Output::header("Build Video");
    println!();
    Output::info(&format!("Composing video for bundle {}", dir));

    let result = orchestrator.build_video(user, dir).await?;

    println!();
    Output::success("Video published");
    Output::kv("URL", &result.video_url);
    Output::kv("Credits left", &result.credit_balance.to_string());

    Ok(())
}
