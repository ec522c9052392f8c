//! Embeddings generation module
//!
//! Turns a user question into the vector the document store is searched with.
//! The dimensionality is owned by the remote model and must match the vectors
//! already stored in the retrieval index.
//!
//! # Examples
//!
//! ```rust,no_run
//! use crux_bot::embeddings::{EmbeddingClient, Embedder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EmbeddingClient::new(
//!         "https://api.openai.com/v1".to_string(),
//!         "text-embedding-ada-002".to_string(),
//!         std::env::var("OPENAI_API_KEY")?,
//!         60,
//!     )?;
//!     let embedding = client.embed("Hello, world!").await?;
//!     println!("Generated embedding with {} dimensions", embedding.len());
//!     Ok(())
//! }
//! ```

pub mod client;

use async_trait::async_trait;

pub use client::EmbeddingClient;

use crate::errors::Result;

/// Default embedding dimension for `text-embedding-ada-002`
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Ordered floats representing the meaning of one query
pub type EmbeddingVector = Vec<f32>;

/// Converts free text into an embedding vector
#[async_trait]
pub trait Embedder: Send + Sync {
    /// # Errors
    /// Any remote failure (network, quota, malformed response); never retried here.
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;
}
