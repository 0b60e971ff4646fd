//! Chat command - interactive RAG session over indexed articles.

use crate::cli::{preflight, Output};
use crate::config::{Prompts, Settings};
use crate::llm::{OpenAIGenerator, TextGenerator};
use crate::orchestrator::Orchestrator;
use crate::rag::RagChat;
use console::style;
use std::io::{self, Write};
use std::sync::Arc;

const CLI_SESSION: &str = "cli";

/// Run an interactive chat session.
pub async fn run_chat(
    doc: Option<String>,
    model: Option<String>,
    settings: Settings,
) -> anyhow::Result<()> {
    preflight::check(preflight::Operation::Chat, &settings)?;

    let orchestrator = Orchestrator::new(settings.clone())?;

    let model = model.unwrap_or_else(|| settings.rag.model.clone());
    let generator: Arc<dyn TextGenerator> = Arc::new(OpenAIGenerator::new(&model, 120));
    let prompts = Prompts::load(None, None)?;
    let rag_chat = RagChat::new(generator, orchestrator.rag_store(), prompts, &settings.rag);

    Output::header("Fortell Chat");
    println!();
    if let Some(doc_id) = &doc {
        Output::info(&format!("Scoped to document {}", doc_id));
    }
    Output::info("Type your question, /clear to reset the session, or /quit to exit.");
    println!();

    loop {
        print!("{} ", style("you>").cyan().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                rag_chat.clear_session(CLI_SESSION);
                Output::info("Session cleared.");
                continue;
            }
            question => {
                match rag_chat.chat(CLI_SESSION, question, doc.as_deref()).await {
                    Ok(answer) => {
                        println!();
                        println!("{} {}", style("fortell>").green().bold(), answer.message);
                        if answer.total_results > 0 {
                            println!(
                                "{}",
                                style(format!("  ({} sources)", answer.total_results)).dim()
                            );
                        }
                        println!();
                    }
                    Err(e) => Output::error(&e.to_string()),
                }
            }
        }
    }

    Output::info("Goodbye.");
    Ok(())
}
