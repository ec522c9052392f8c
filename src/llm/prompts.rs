//! Prompts for grounded question answering

use super::ChatMessage;

/// Persona and behaviour instruction sent as the system turn
pub const SYSTEM_PROMPT: &str = "You are Crux, an expert in helping people with their questions. \n\
Use the provided context to answer accurately and helpfully.";

/// Build the user turn: retrieved context first, then the verbatim question.
/// The context section is always present, even when empty.
pub fn build_user_content(question: &str, context: &str) -> String {
    format!("Context: {context}\n\nQuestion: {question}")
}

/// Exactly two entries, system then user, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    messages: [ChatMessage; 2],
}

impl Prompt {
    pub fn new(system_prompt: &str, question: &str, context: &str) -> Self {
        Self {
            messages: [
                ChatMessage::system(system_prompt),
                ChatMessage::user(build_user_content(question, context)),
            ],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}
