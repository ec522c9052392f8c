//! `OpenAI` embeddings API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::Embedder;
use super::EmbeddingVector;
use crate::config::AppConfig;
use crate::config::Credentials;
use crate::errors::CruxError;
use crate::errors::Result;

/// Client for the `/embeddings` endpoint
pub struct EmbeddingClient {
    model: String,
    endpoint: String,
    api_key: String,
    client: Client,
}

impl EmbeddingClient {
    /// Create a new embedding client
    ///
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

    /// Create from application configuration and credentials
    pub fn from_config(config: &AppConfig, credentials: &Credentials) -> Result<Self> {
        Self::new(
            config.openai.endpoint.clone(),
            config.openai.embedding_model.clone(),
            credentials.openai_api_key.clone(),
            config.http.timeout_secs,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let url = format!("{}/embeddings", self.endpoint);
        debug!("Calling OpenAI embeddings API: {}", url);

        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
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
            return Err(CruxError::EmbeddingError(format!(
                "OpenAI API error ({status}): {error_text}"
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| CruxError::EmbeddingError(format!("Failed to parse response: {e}")))?;

        let embedding = result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| CruxError::EmbeddingError("No embedding in response".to_string()))?;

        debug!("Received embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}
