//! Search command - query the retrieval index directly.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;

/// Run a similarity search against the index.
pub async fn run_search(
    query: &str,
    limit: usize,
    doc: Option<String>,
    settings: Settings,
) -> anyhow::Result<()> {
    preflight::check(preflight::Operation::Search, &settings)?;

    let orchestrator = Orchestrator::new(settings)?;
    let results = orchestrator
        .rag_store()
        .search(query, limit, doc.as_deref())
        .await?;

    if results.is_empty() {
        Output::info("No results found.");
        return Ok(());
    }

    Output::header(&format!("Results for \"{}\"", query));
    for result in results {
        Output::search_result(
            &result.doc_id,
            result.chunk_index,
            result.score,
            &result.content,
        );
    }
    println!();

    Ok(())
}
