//! Outbound replies through the channel's connector REST API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use tracing::warn;
use url::Url;

use super::ReplySender;
use crate::config::AppConfig;
use crate::config::Credentials;
use crate::errors::CruxError;
use crate::errors::Result;
use crate::models::Activity;
use crate::models::ResourceResponse;

pub struct BotConnector {
    app_id: String,
    app_password: String,
    token_endpoint: String,
    token_scope: String,
    trusted_hosts: Vec<String>,
    client: Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl BotConnector {
    pub fn new(
        app_id: String,
        app_password: String,
        token_endpoint: String,
        token_scope: String,
        trusted_hosts: Vec<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CruxError::HttpError(e.to_string()))?;

        Ok(Self {
            app_id,
            app_password,
            token_endpoint,
            token_scope,
            trusted_hosts,
            client,
        })
    }

    pub fn from_config(config: &AppConfig, credentials: &Credentials) -> Result<Self> {
        Self::new(
            credentials.app_id.clone(),
            credentials.app_password.clone(),
            config.channel.token_endpoint.clone(),
            config.channel.token_scope.clone(),
            config.channel.trusted_service_hosts.clone(),
            config.http.timeout_secs,
        )
    }

    /// Obtain a bearer token with the client-credentials grant. `None` when
    /// the bot runs without an app id.
    async fn access_token(&self) -> Result<Option<String>> {
        if self.app_id.is_empty() {
            return Ok(None);
        }

        debug!("Requesting channel access token from {}", self.token_endpoint);
        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.app_id.as_str()),
                ("client_secret", self.app_password.as_str()),
                ("scope", self.token_scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| CruxError::ChannelError(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(CruxError::ChannelError(format!(
                "token endpoint returned {status}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CruxError::ChannelError(format!("malformed token response: {e}")))?;
        Ok(Some(token.access_token))
    }

    /// Whether a bearer token may be sent to `url`
    fn is_trusted(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| is_trusted_host(host, &self.trusted_hosts))
    }
}

/// `host` equals an entry or is a subdomain of one
pub fn is_trusted_host(host: &str, trusted: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    trusted.iter().any(|entry| {
        let entry = entry.trim_start_matches('.').to_ascii_lowercase();
        !entry.is_empty() && (host == entry || host.ends_with(&format!(".{entry}")))
    })
}

/// `{serviceUrl}/v3/conversations/{conversationId}/activities[/{activityId}]`
/// with each id percent-encoded as a single path segment.
pub fn reply_url(inbound: &Activity) -> Result<Url> {
    let service_url = inbound
        .service_url
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CruxError::ChannelError("activity has no serviceUrl".to_string()))?;

    let conversation_id = inbound.conversation_id();
    if conversation_id.is_empty() {
        return Err(CruxError::ChannelError(
            "activity has no conversation id".to_string(),
        ));
    }

    let mut url = Url::parse(service_url)
        .map_err(|e| CruxError::ChannelError(format!("invalid serviceUrl {service_url:?}: {e}")))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| CruxError::ChannelError("serviceUrl cannot be a base".to_string()))?;
        segments
            .pop_if_empty()
            .extend(["v3", "conversations", conversation_id, "activities"]);
        if let Some(id) = inbound.id.as_deref().filter(|id| !id.is_empty()) {
            segments.push(id);
        }
    }
    Ok(url)
}

#[async_trait]
impl ReplySender for BotConnector {
    async fn send_reply(&self, inbound: &Activity, text: &str) -> Result<()> {
        let url = reply_url(inbound)?;
        let reply = inbound.create_reply(text);

        let mut request = self.client.post(url.clone()).json(&reply);
        if !self.app_id.is_empty() {
            if !self.is_trusted(&url) {
                warn!("Refusing to send channel credentials to {}", url);
                return Err(CruxError::ChannelError(format!(
                    "service url host {:?} is not trusted",
                    url.host_str().unwrap_or("")
                )));
            }
            if let Some(token) = self.access_token().await? {
                request = request.bearer_auth(token);
            }
        }

        debug!("Posting reply to {}", url);
        let response = request
            .send()
            .await
            .map_err(|e| CruxError::ChannelError(format!("reply delivery failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CruxError::ChannelError(format!(
                "connector returned {status}: {error_text}"
            )));
        }

        let resource: ResourceResponse = response.json().await.unwrap_or_default();
        debug!("Reply accepted by channel (id={:?})", resource.id);
        Ok(())
    }
}
