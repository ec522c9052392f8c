//! Channel adapter: authorize, dispatch to the turn handler, shape the response

use std::sync::Arc;

use tracing::debug;
use tracing::info;

use super::BotConnector;
use super::BotFrameworkAuthenticator;
use super::ChannelAuthenticator;
use super::ReplySender;
use super::SigningKeys;
use crate::bot::TurnHandler;
use crate::bot::TurnOutcome;
use crate::config::AppConfig;
use crate::config::Credentials;
use crate::embeddings::EmbeddingClient;
use crate::errors::Result;
use crate::llm::AnswerGenerator;
use crate::llm::LlmClient;
use crate::models::Activity;
use crate::models::InvokeResponse;
use crate::rag::MatchParams;
use crate::rag::SupabaseRetriever;

/// Status returned for invoke activities nobody answered
pub const INVOKE_NOT_IMPLEMENTED: u16 = 501;

pub struct ChannelAdapter {
    authenticator: Arc<dyn ChannelAuthenticator>,
    sender: Arc<dyn ReplySender>,
    handler: TurnHandler,
}

impl ChannelAdapter {
    pub fn new(
        authenticator: Arc<dyn ChannelAuthenticator>,
        sender: Arc<dyn ReplySender>,
        handler: TurnHandler,
    ) -> Self {
        Self {
            authenticator,
            sender,
            handler,
        }
    }

    /// Build every external client once from configuration.
    ///
    /// # Errors
    /// HTTP client construction failures.
    pub fn from_config(config: &AppConfig, credentials: &Credentials) -> Result<Self> {
        let handler = build_turn_handler(config, credentials)?;
        let keys = SigningKeys::from_config(config)?;
        let authenticator = Arc::new(BotFrameworkAuthenticator::new(
            credentials.app_id.clone(),
            keys,
        ));
        let sender = Arc::new(BotConnector::from_config(config, credentials)?);

        if credentials.channel_auth_enabled() {
            info!("Channel authentication enabled for app id {}", credentials.app_id);
        } else {
            info!("No app id configured, accepting unauthenticated channel requests");
        }

        Ok(Self::new(authenticator, sender, handler))
    }

    /// Process one inbound activity.
    ///
    /// Returns the synchronous response the channel expects, or `None` when
    /// the activity needs no explicit response.
    ///
    /// # Errors
    /// - `Unauthorized` when the request fails authorization
    /// - `ChannelError` when the reply could not be delivered
    pub async fn process_activity(
        &self,
        activity: Activity,
        auth_header: &str,
    ) -> Result<Option<InvokeResponse>> {
        self.authenticator.authenticate(auth_header, &activity).await?;

        let outcome = self.handler.on_turn(&activity, self.sender.as_ref()).await?;
        if let TurnOutcome::Failed { failed_at, .. } = &outcome {
            debug!("Turn failed while {}, error reply sent", failed_at);
        }

        if activity.is_invoke() {
            return Ok(Some(InvokeResponse {
                status: INVOKE_NOT_IMPLEMENTED,
                body: None,
            }));
        }
        Ok(None)
    }
}

/// Wire the embedding, retrieval and completion clients into a turn handler
pub fn build_turn_handler(config: &AppConfig, credentials: &Credentials) -> Result<TurnHandler> {
    let embedder = Arc::new(EmbeddingClient::from_config(config, credentials)?);
    let store = Arc::new(SupabaseRetriever::from_config(config, credentials)?);
    let generator = AnswerGenerator::new(Arc::new(LlmClient::from_config(config, credentials)?));

    Ok(TurnHandler::new(
        embedder,
        store,
        generator,
        MatchParams::from(&config.retrieval),
    ))
}
