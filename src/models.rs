//! Channel activity envelope and related wire types

use serde::Deserialize;
use serde::Serialize;

/// Activity type for user messages
pub const MESSAGE_ACTIVITY: &str = "message";
/// Activity type for synchronous invoke requests
pub const INVOKE_ACTIVITY: &str = "invoke";

/// A user, bot or other participant on the channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// The conversation an activity belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
}

/// One conversation turn as delivered by the channel.
///
/// Only the fields the bot reads or echoes are modelled; anything else in the
/// envelope is ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type", default)]
    pub activity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl Activity {
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.activity_type == MESSAGE_ACTIVITY
    }

    #[must_use]
    pub fn is_invoke(&self) -> bool {
        self.activity_type == INVOKE_ACTIVITY
    }

    /// Conversation id, or an empty string when the envelope carries none
    #[must_use]
    pub fn conversation_id(&self) -> &str {
        self.conversation.as_ref().map_or("", |c| c.id.as_str())
    }

    /// Build the outbound message answering this activity: sender and
    /// recipient swapped, same conversation, `replyToId` pointing back.
    #[must_use]
    pub fn create_reply(&self, text: impl Into<String>) -> Self {
        Self {
            activity_type: MESSAGE_ACTIVITY.to_string(),
            id: None,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            service_url: self.service_url.clone(),
            channel_id: self.channel_id.clone(),
            from: self.recipient.clone(),
            recipient: self.from.clone(),
            conversation: self.conversation.clone(),
            text: Some(text.into()),
            reply_to_id: self.id.clone(),
            locale: self.locale.clone(),
        }
    }
}

/// Synchronous response the adapter hands back to the HTTP layer
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeResponse {
    pub status: u16,
    pub body: Option<serde_json::Value>,
}

/// Body of the channel connector's answer to a posted activity
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceResponse {
    #[serde(default)]
    pub id: String,
}
