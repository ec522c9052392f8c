//! `OpenAI` chat-completions client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::ChatMessage;
use super::ChatModel;
use crate::config::AppConfig;
use crate::config::Credentials;
use crate::errors::CruxError;
use crate::errors::Result;

pub struct LlmClient {
    model: String,
    endpoint: String,
    api_key: String,
    client: Client,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl LlmClient {
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(endpoint: String, model: String, api_key: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CruxError::HttpError(e.to_string()))?;

        Ok(Self {
            model,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    pub fn from_config(config: &AppConfig, credentials: &Credentials) -> Result<Self> {
        Self::new(
            config.openai.endpoint.clone(),
            config.openai.chat_model.clone(),
            credentials.openai_api_key.clone(),
            config.http.timeout_secs,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Option<String>> {
        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Calling chat completions: model={}, {} messages", self.model, messages.len());

        let request = CompletionRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CruxError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CruxError::LlmError(format!(
                "OpenAI API error ({status}): {error_text}"
            )));
        }

        let result: CompletionResponse = response
            .json()
            .await
            .map_err(|e| CruxError::LlmError(format!("Failed to parse response: {e}")))?;

        Ok(result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content))
    }
}
