use thiserror::Error;

#[derive(Error, Debug)]
pub enum CruxError {
    #[error("Environment variable {0} is not set")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Retrieval error: {0}")]
    RetrievalError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid activity: {0}")]
    InvalidActivity(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("Configuration source error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CruxError {
    /// True for failures raised by the embedding, retrieval or completion calls.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::HttpError(_) | Self::EmbeddingError(_) | Self::RetrievalError(_) | Self::LlmError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CruxError>;
