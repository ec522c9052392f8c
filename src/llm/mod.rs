//! Chat-completion access and answer generation

pub mod client;
pub mod generator;
pub mod prompts;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

pub use client::LlmClient;
pub use generator::AnswerGenerator;
pub use generator::NO_ANSWER_FALLBACK;
pub use prompts::Prompt;

use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One role-tagged entry of a chat prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A remote chat-completion model
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the first completion's text, or `None` when the model produced none.
    ///
    /// # Errors
    /// Any remote failure; never retried here.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Option<String>>;
}
