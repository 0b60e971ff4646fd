//! Summarize command - run the full article-to-bundle pipeline.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;

/// Run the summarize pipeline from the CLI.
pub async fn run_summarize(url: &str, user: &str, settings: Settings) -> anyhow::Result<()> {
    preflight::check(preflight::Operation::Summarize, &settings)?;

    let orchestrator = Orchestrator::new(settings)?;

    Output::header("Summarize");
    println!();
    Output::info(&format!("Processing {}", url));
    println!();

    let result = orchestrator.summarize_url(user, url).await?;

    Output::success("Stories generated");
    println!();
    for (i, summary) in result.summaries.iter().enumerate() {
        Output::list_item(&format!("Story {}: {}", i + 1, summary));
    }
    println!();
    Output::kv("Bundle", &result.stories_dir);
    Output::kv("Document ID", &result.doc_id);
    Output::kv("Chunks indexed", &result.chunks_indexed.to_string());
    Output::kv("Credits left", &result.credit_balance.to_string());
    println!();
    Output::info(&format!(
        "Build the video with: fortell build-video {} --user {}",
        result.stories_dir, user
    ));

    Ok(())
}
