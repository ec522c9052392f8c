use std::fmt;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::errors::CruxError;

/// Environment variable holding the model API key.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable holding the vector-store base URL.
pub const SUPABASE_URL: &str = "SUPABASE_URL";
/// Environment variable holding the vector-store service key.
pub const SUPABASE_KEY: &str = "SUPABASE_KEY";
/// Environment variable holding the channel app id.
pub const MICROSOFT_APP_ID: &str = "MICROSOFT_APP_ID";
/// Environment variable holding the channel app secret.
pub const MICROSOFT_APP_PASSWORD: &str = "MICROSOFT_APP_PASSWORD";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3978,
        }
    }
}

/// Settings shared by every outbound HTTP client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub endpoint: String,
    pub embedding_model: String,
    pub chat_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            chat_model: "gpt-4".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Name of the remote similarity-search function
    pub function: String,
    pub match_threshold: f32,
    pub match_count: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            function: "match_documents".to_string(),
            match_threshold: 0.7,
            match_count: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// OAuth2 endpoint used to obtain outbound bearer tokens
    pub token_endpoint: String,
    pub token_scope: String,
    /// OpenID metadata naming the key set that signs inbound tokens
    pub openid_metadata_url: String,
    /// Hosts (and their subdomains) an outbound bearer token may be sent to
    pub trusted_service_hosts: Vec<String>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            token_endpoint: "https://login.microsoftonline.com/botframework.com/oauth2/v2.0/token"
                .to_string(),
            token_scope: "https://api.botframework.com/.default".to_string(),
            openid_metadata_url: "https://login.botframework.com/v1/.well-known/openidconfiguration"
                .to_string(),
            trusted_service_hosts: vec![
                "botframework.com".to_string(),
                "trafficmanager.net".to_string(),
                "botframework.azure.us".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: "logs".to_string(),
        }
    }
}

/// Non-secret settings. Every field has a default so an empty file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub openai: OpenAiConfig,
    pub retrieval: RetrievalConfig,
    pub channel: ChannelConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from defaults, an optional `config.toml` and
    /// `CRUX__SECTION__KEY` environment overrides.
    pub fn load() -> crate::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name("config").required(false))
            .add_source(
                ::config::Environment::with_prefix("CRUX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.retrieval.match_count == 0 {
            return Err(CruxError::ConfigError(
                "retrieval.match_count must be at least 1".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.retrieval.match_threshold) {
            return Err(CruxError::ConfigError(format!(
                "retrieval.match_threshold must be within [-1, 1], got {}",
                self.retrieval.match_threshold
            )));
        }
        url::Url::parse(&self.openai.endpoint).map_err(|e| {
            CruxError::ConfigError(format!("openai.endpoint is not a valid URL: {e}"))
        })?;
        url::Url::parse(&self.channel.token_endpoint).map_err(|e| {
            CruxError::ConfigError(format!("channel.token_endpoint is not a valid URL: {e}"))
        })?;
        url::Url::parse(&self.channel.openid_metadata_url).map_err(|e| {
            CruxError::ConfigError(format!("channel.openid_metadata_url is not a valid URL: {e}"))
        })?;
        if self.http.timeout_secs == 0 {
            return Err(CruxError::ConfigError(
                "http.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Address the HTTP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Connection secrets. All five are required before any request is served.
#[derive(Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub supabase_url: String,
    pub supabase_key: String,
    pub app_id: String,
    pub app_password: String,
}

impl Credentials {
    /// Read every secret from the process environment
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read every secret through `lookup`, failing on the first absent name
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require =
            |name: &str| lookup(name).ok_or_else(|| CruxError::MissingEnvVar(name.to_string()));

        Ok(Self {
            openai_api_key: require(OPENAI_API_KEY)?,
            supabase_url: require(SUPABASE_URL)?,
            supabase_key: require(SUPABASE_KEY)?,
            app_id: require(MICROSOFT_APP_ID)?,
            app_password: require(MICROSOFT_APP_PASSWORD)?,
        })
    }

    /// An empty app id means the channel runs unauthenticated (emulator mode)
    pub fn channel_auth_enabled(&self) -> bool {
        !self.app_id.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &mask_secret(&self.openai_api_key))
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &mask_secret(&self.supabase_key))
            .field("app_id", &self.app_id)
            .field("app_password", &mask_secret(&self.app_password))
            .finish()
    }
}

/// Mask a secret for display, keeping only the last four characters
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}
