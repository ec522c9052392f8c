pub mod api;
pub mod bot;
pub mod channel;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod models;
pub mod rag;


pub use config::AppConfig;
pub use config::Credentials;
pub use errors::*;
