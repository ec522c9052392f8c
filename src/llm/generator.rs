//! Answer generation over a [`ChatModel`]

use std::sync::Arc;

use tracing::debug;

use super::prompts::Prompt;
use super::ChatModel;
use crate::errors::Result;

/// Reply used when the model returns no text
pub const NO_ANSWER_FALLBACK: &str = "Sorry, I could not generate an answer.";

#[derive(Clone)]
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Ask the model to answer `question` grounded in `context`.
    ///
    /// # Errors
    /// Propagates remote failures from the model unchanged.
    pub async fn generate(&self, system_prompt: &str, question: &str, context: &str) -> Result<String> {
        let prompt = Prompt::new(system_prompt, question, context);
        let answer = self.model.complete(prompt.messages()).await?;

        match answer {
            Some(text) if !text.is_empty() => Ok(text),
            _ => {
                debug!("Model returned no text, using fallback answer");
                Ok(NO_ANSWER_FALLBACK.to_string())
            }
        }
    }
}
