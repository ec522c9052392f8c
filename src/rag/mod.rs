//! Document retrieval against the external vector-similarity store
//!
//! The similarity metric, index and ranking all live in the store; this module
//! only shapes the request and unwraps the best match.

pub mod retriever;

use async_trait::async_trait;

pub use retriever::SupabaseRetriever;

use crate::errors::Result;

/// How many candidates to ask for and how similar they must be
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchParams {
    pub threshold: f32,
    pub limit: u32,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            limit: 1,
        }
    }
}

impl From<&crate::config::RetrievalConfig> for MatchParams {
    fn from(config: &crate::config::RetrievalConfig) -> Self {
        Self {
            threshold: config.match_threshold,
            limit: config.match_count,
        }
    }
}

/// Best matching document text, if any candidate cleared the threshold
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievedContext(Option<String>);

impl RetrievedContext {
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    #[must_use]
    pub fn found(content: impl Into<String>) -> Self {
        Self(Some(content.into()))
    }

    #[must_use]
    pub const fn is_match(&self) -> bool {
        self.0.is_some()
    }

    /// Snippet text; the empty string when nothing matched
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_deref().unwrap_or("")
    }
}

/// Similarity search over stored documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// # Errors
    /// Transport or non-success responses from the store. An empty or
    /// unrecognised result list is not an error.
    async fn retrieve(&self, query: &[f32], params: MatchParams) -> Result<RetrievedContext>;
}
