//! Supabase RPC retriever calling a `match_documents`-style SQL function

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use super::DocumentStore;
use super::MatchParams;
use super::RetrievedContext;
use crate::config::AppConfig;
use crate::config::Credentials;
use crate::errors::CruxError;
use crate::errors::Result;

/// Calls `POST {url}/rest/v1/rpc/{function}` on a Supabase project
pub struct SupabaseRetriever {
    base_url: String,
    api_key: String,
    function: String,
    client: Client,
}

#[derive(Serialize)]
struct MatchRequest<'a> {
    query_embedding: &'a [f32],
    match_threshold: f32,
    match_count: u32,
}

impl SupabaseRetriever {
    pub fn new(base_url: String, api_key: String, function: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CruxError::HttpError(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            function,
            client,
        })
    }

    pub fn from_config(config: &AppConfig, credentials: &Credentials) -> Result<Self> {
        Self::new(
            credentials.supabase_url.clone(),
            credentials.supabase_key.clone(),
            config.retrieval.function.clone(),
            config.http.timeout_secs,
        )
    }

    fn rpc_url(&self) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, self.function)
    }
}

/// Take the first row's `content`. Anything that is not a list whose first
/// element carries a string `content` counts as no match.
pub(crate) fn first_content(rows: &Value) -> Option<String> {
    rows.as_array()?
        .first()?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl DocumentStore for SupabaseRetriever {
    async fn retrieve(&self, query: &[f32], params: MatchParams) -> Result<RetrievedContext> {
        let url = self.rpc_url();
        debug!(
            "Calling {} (threshold={}, count={})",
            url, params.threshold, params.limit
        );

        let request = MatchRequest {
            query_embedding: query,
            match_threshold: params.threshold,
            match_count: params.limit,
        };

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
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
            return Err(CruxError::RetrievalError(format!(
                "Supabase RPC error ({status}): {error_text}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CruxError::HttpError(e.to_string()))?;

        // TODO: decide with product whether a malformed body should fail the turn
        // instead of silently producing an empty context.
        let rows: Value = match serde_json::from_slice(&body) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Unparseable match_documents response, treating as no match: {}", e);
                return Ok(RetrievedContext::none());
            }
        };

        match first_content(&rows) {
            Some(content) => {
                debug!("Retrieved document ({} chars)", content.len());
                Ok(RetrievedContext::found(content))
            }
            None => {
                if !rows.as_array().is_some_and(Vec::is_empty) {
                    warn!("Unexpected match_documents response shape, treating as no match");
                }
                debug!("No document cleared the similarity threshold");
                Ok(RetrievedContext::none())
            }
        }
    }
}
