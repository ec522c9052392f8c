//! Bot Framework channel plumbing: inbound authorization, outbound replies
//! and the adapter that ties them to the turn handler.

pub mod adapter;
pub mod auth;
pub mod connector;

use async_trait::async_trait;

pub use adapter::ChannelAdapter;
pub use auth::BotFrameworkAuthenticator;
pub use auth::ChannelAuthenticator;
pub use auth::SigningKeys;
pub use connector::BotConnector;

use crate::errors::Result;
use crate::models::Activity;

/// Delivers a text reply to the conversation an activity came from
#[async_trait]
pub trait ReplySender: Send + Sync {
    /// # Errors
    /// The reply could not be delivered to the channel.
    async fn send_reply(&self, inbound: &Activity, text: &str) -> Result<()>;
}
