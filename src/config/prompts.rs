//! Prompt templates for Fortell.
//!
//! Prompts can be customized by placing TOML files in a custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub summary: SummaryPrompts,
    pub rag: RagPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for chunk summarization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryPrompts {
    pub user: String,
}

impl Default for SummaryPrompts {
    fn default() -> Self {
        Self {
            user: r#"Create a direct, clear narrative summary of the following text in exactly {{max_words}} words.
Present it as a standalone story without any introductory phrases like "here's" or "let me try".
Focus on the key information in an engaging, story-like format. Use natural, human-friendly language:

{{text}}

Remember: The summary must be exactly {{max_words}} words or less while maintaining a natural flow and including key information."#
                .to_string(),
        }
    }
}

/// Prompts for RAG chat: query rewriting and context-bound answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub rewrite_system: String,
    pub answer_system: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            rewrite_system: r#"You are a query rewriting expert. Based on the provided chat history, rephrase the "Follow Up user Question" into a complete, standalone question that can be understood without the chat history.
Only output the rewritten question and nothing else."#
                .to_string(),

            answer_system: r#"You are a helpful AI assistant that answers questions based ONLY on the provided context.

IMPORTANT RULES:
1. Base your answers EXCLUSIVELY on the information provided in the context below
2. If the context doesn't contain enough information to answer the question, clearly state "I don't have enough information to answer this question"
3. Do not use any external knowledge or make assumptions beyond what's in the context
4. If you're unsure about something, acknowledge the uncertainty
5. Be concise and direct in your responses
6. If multiple sources contain relevant information, synthesize the information appropriately
7. CRITICAL: Answer naturally without mentioning "context", "documents", "provided information", "sources", or "based on" phrases
8. Write as if you naturally know this information, but stick strictly to only what's provided below
9. Don't reference where the information comes from - just present it as factual knowledge

Context:
{{context}}

Remember: Answer ONLY based on the context provided above. Do not add information from outside sources. Present your answer naturally without referencing the context or sources."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let summary_path = custom_path.join("summary.toml");
            if summary_path.exists() {
                let content = std::fs::read_to_string(&summary_path)?;
                prompts.summary = toml::from_str(&content)?;
            }

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.summary.user.contains("{{text}}"));
        assert!(prompts.rag.answer_system.contains("{{context}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Summarize in {{max_words}} words: {{text}}";
        let mut vars = std::collections::HashMap::new();
        vars.insert("max_words".to_string(), "50".to_string());
        vars.insert("text".to_string(), "hello".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Summarize in 50 words: hello");
    }
}
