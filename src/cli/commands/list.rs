//! List command - show indexed documents.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;

/// List all indexed documents.
pub async fn run_list(settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let documents = orchestrator.rag_store().list_documents().await?;

    if documents.is_empty() {
        Output::info("No documents indexed yet. Run: fortell summarize <url>");
        return Ok(());
    }

    Output::header(&format!("Indexed Documents ({})", documents.len()));
    println!();
    for doc in documents {
        Output::document_info(&doc.doc_id, &doc.source, doc.chunk_count);
    }
    println!();

    Ok(())
}
