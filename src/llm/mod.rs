//! Text generation abstraction.
//!
//! Summarization, query rewriting and RAG answering all go through the
//! [`TextGenerator`] trait so tests can substitute deterministic fakes.

mod openai;

pub use openai::OpenAIGenerator;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One turn of a conversation passed to a generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Trait for chat-completion text generators.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the given turns, with an optional system
    /// instruction.
    async fn generate(&self, system: Option<&str>, turns: &[ChatTurn]) -> Result<String>;
}
