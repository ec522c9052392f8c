//! Turn handler: Embedding -> Retrieval -> Generation -> Reply

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;
use tracing::Instrument;

use crate::channel::ReplySender;
use crate::embeddings::Embedder;
use crate::errors::CruxError;
use crate::errors::Result;
use crate::llm::prompts::SYSTEM_PROMPT;
use crate::llm::AnswerGenerator;
use crate::models::Activity;
use crate::rag::DocumentStore;
use crate::rag::MatchParams;
use crate::rag::RetrievedContext;

/// Prefix of the reply sent when any pipeline step fails
pub const ERROR_REPLY_PREFIX: &str = "Sorry, an error occurred: ";

/// Progress of one turn. Linear; any step may jump to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Received,
    Embedding,
    Retrieving,
    Generating,
    Replied,
    Failed,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Embedding => "embedding",
            Self::Retrieving => "retrieving",
            Self::Generating => "generating",
            Self::Replied => "replied",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Generated answer together with the context it was grounded on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub context: RetrievedContext,
}

/// What happened to an inbound activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Not a user message; nothing was called or sent
    Ignored,
    /// The model's answer (or the no-text fallback) was sent
    Answered { reply: String },
    /// A pipeline step failed and the error reply was sent
    Failed { reply: String, failed_at: TurnState },
}

impl TurnOutcome {
    /// Text that was sent back, if any
    pub fn reply(&self) -> Option<&str> {
        match self {
            Self::Ignored => None,
            Self::Answered { reply } | Self::Failed { reply, .. } => Some(reply),
        }
    }
}

/// Orchestrates one turn. Holds only shared, read-only clients, so a single
/// instance serves every concurrent turn.
#[derive(Clone)]
pub struct TurnHandler {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn DocumentStore>,
    generator: AnswerGenerator,
    params: MatchParams,
    system_prompt: String,
}

impl TurnHandler {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn DocumentStore>,
        generator: AnswerGenerator,
        params: MatchParams,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            params,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Run the retrieval-augmented pipeline for one question.
    ///
    /// # Errors
    /// The first failing step's error, tagged with the state it failed in.
    pub async fn answer(&self, question: &str) -> std::result::Result<Answer, (TurnState, CruxError)> {
        if question.trim().is_empty() {
            return Err((
                TurnState::Received,
                CruxError::InvalidActivity("message text is empty".to_string()),
            ));
        }

        debug!(state = %TurnState::Embedding, "turn transition");
        let embedding = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| (TurnState::Embedding, e))?;

        debug!(state = %TurnState::Retrieving, dimensions = embedding.len(), "turn transition");
        let context = self
            .store
            .retrieve(&embedding, self.params)
            .await
            .map_err(|e| (TurnState::Retrieving, e))?;

        debug!(state = %TurnState::Generating, has_context = context.is_match(), "turn transition");
        let text = self
            .generator
            .generate(&self.system_prompt, question, context.as_str())
            .await
            .map_err(|e| (TurnState::Generating, e))?;

        Ok(Answer { text, context })
    }

    /// Handle one inbound activity, sending exactly one reply for a message
    /// and none for anything else.
    ///
    /// # Errors
    /// Only when the reply itself cannot be delivered; pipeline failures are
    /// turned into the error reply.
    pub async fn on_turn(&self, activity: &Activity, sender: &dyn ReplySender) -> Result<TurnOutcome> {
        if !activity.is_message() {
            debug!("Ignoring activity of type {:?}", activity.activity_type);
            return Ok(TurnOutcome::Ignored);
        }

        let span = tracing::info_span!(
            "turn",
            conversation = %activity.conversation_id(),
            activity_id = activity.id.as_deref().unwrap_or(""),
        );

        async move {
            let question = activity.text.as_deref().unwrap_or("");
            let outcome = match self.answer(question).await {
                Ok(answer) => TurnOutcome::Answered { reply: answer.text },
                Err((failed_at, error)) => {
                    warn!(
                        state = %TurnState::Failed,
                        %failed_at,
                        remote = error.is_remote(),
                        "turn failed: {}",
                        error
                    );
                    TurnOutcome::Failed {
                        reply: format!("{ERROR_REPLY_PREFIX}{error}"),
                        failed_at,
                    }
                }
            };

            if let Some(reply) = outcome.reply() {
                sender.send_reply(activity, reply).await?;
            }

            if matches!(outcome, TurnOutcome::Answered { .. }) {
                info!(state = %TurnState::Replied, "turn answered");
            }
            Ok::<_, CruxError>(outcome)
        }
        .instrument(span)
        .await
    }
}
