//! Inbound request authorization.
//!
//! Tokens are issued by the channel's identity provider and signed with the
//! keys it publishes through its OpenID metadata. A token is accepted only
//! when its RS256 signature verifies against that key set and its claims are
//! addressed to this bot, unexpired and from a channel issuer. Tokens issued
//! by the channel service itself must also be bound to the activity's
//! service URL.

use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use jsonwebtoken::decode;
use jsonwebtoken::decode_header;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::Validation;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::CruxError;
use crate::errors::Result;
use crate::models::Activity;

/// Tolerated clock difference when checking `exp` and `nbf`
pub const CLOCK_SKEW_SECS: u64 = 300;

/// Unknown key ids trigger at most one key refresh per interval
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Issuer of tokens minted by the channel service for bot traffic
const CHANNEL_ISSUER: &str = "https://api.botframework.com";

const TRUSTED_ISSUERS: &[&str] = &[
    CHANNEL_ISSUER,
    "https://sts.windows.net/d6d49420-f39b-4df7-a1dc-d59a935871db/",
    "https://login.microsoftonline.com/d6d49420-f39b-4df7-a1dc-d59a935871db/v2.0",
    "https://sts.windows.net/f8cdef31-a31e-4b4a-93e4-5f571e91255a/",
    "https://login.microsoftonline.com/f8cdef31-a31e-4b4a-93e4-5f571e91255a/v2.0",
];

/// Decides whether an inbound request may be processed
#[async_trait]
pub trait ChannelAuthenticator: Send + Sync {
    /// `auth_header` is the raw `Authorization` value, empty when absent.
    ///
    /// # Errors
    /// `CruxError::Unauthorized` when the request must be rejected.
    async fn authenticate(&self, auth_header: &str, activity: &Activity) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    iss: String,
    #[serde(default)]
    serviceurl: Option<String>,
}

#[derive(Deserialize)]
struct OpenIdMetadata {
    jwks_uri: String,
}

enum KeySource {
    /// Keys supplied up front and never refreshed
    Fixed,
    /// Keys discovered through the OpenID metadata document
    Remote { metadata_url: String, client: Client },
}

struct KeyCache {
    keys: JwkSet,
    fetched_at: Option<Instant>,
}

/// Public keys of the channel's identity provider, looked up by key id
pub struct SigningKeys {
    source: KeySource,
    cache: RwLock<KeyCache>,
}

impl SigningKeys {
    /// Keys fetched lazily from `metadata_url` and refreshed when an unknown
    /// key id shows up.
    pub fn new(metadata_url: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CruxError::HttpError(e.to_string()))?;

        Ok(Self {
            source: KeySource::Remote {
                metadata_url,
                client,
            },
            cache: RwLock::new(KeyCache {
                keys: JwkSet { keys: Vec::new() },
                fetched_at: None,
            }),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.channel.openid_metadata_url.clone(),
            config.http.timeout_secs,
        )
    }

    /// A fixed key set
    pub fn fixed(keys: JwkSet) -> Self {
        Self {
            source: KeySource::Fixed,
            cache: RwLock::new(KeyCache {
                keys,
                fetched_at: None,
            }),
        }
    }

    /// # Errors
    /// - `Unauthorized` when no published key carries `kid`
    /// - `ChannelError` when the key set cannot be fetched
    pub async fn decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        if let Some(key) = self.cached(kid).await? {
            return Ok(key);
        }

        if let KeySource::Remote {
            metadata_url,
            client,
        } = &self.source
        {
            let mut cache = self.cache.write().await;
            let stale = cache
                .fetched_at
                .map_or(true, |at| at.elapsed() >= MIN_REFRESH_INTERVAL);
            if stale {
                cache.keys = fetch_key_set(client, metadata_url).await?;
                cache.fetched_at = Some(Instant::now());
                info!("Loaded {} channel signing keys", cache.keys.keys.len());
            }
        }

        self.cached(kid)
            .await?
            .ok_or_else(|| CruxError::Unauthorized(format!("unknown signing key {kid:?}")))
    }

    async fn cached(&self, kid: &str) -> Result<Option<DecodingKey>> {
        let cache = self.cache.read().await;
        cache
            .keys
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()
            .map_err(|e| CruxError::Unauthorized(format!("unusable signing key {kid:?}: {e}")))
    }
}

async fn fetch_key_set(client: &Client, metadata_url: &str) -> Result<JwkSet> {
    debug!("Fetching OpenID metadata from {}", metadata_url);
    let metadata: OpenIdMetadata = get_json(client, metadata_url).await?;
    debug!("Fetching signing keys from {}", metadata.jwks_uri);
    get_json(client, &metadata.jwks_uri).await
}

async fn get_json<T: serde::de::DeserializeOwned>(client: &Client, url: &str) -> Result<T> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| CruxError::ChannelError(format!("signing key request failed: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        return Err(CruxError::ChannelError(format!(
            "signing key endpoint {url} returned {status}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| CruxError::ChannelError(format!("malformed signing key response: {e}")))
}

pub struct BotFrameworkAuthenticator {
    app_id: String,
    keys: SigningKeys,
    validation: Validation,
}

impl BotFrameworkAuthenticator {
    pub fn new(app_id: impl Into<String>, keys: SigningKeys) -> Self {
        let app_id = app_id.into();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[app_id.as_str()]);
        validation.set_issuer(TRUSTED_ISSUERS);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);
        validation.leeway = CLOCK_SKEW_SECS;

        Self {
            app_id,
            keys,
            validation,
        }
    }

    async fn verify(&self, token: &str) -> Result<Claims> {
        let header = decode_header(token)
            .map_err(|e| CruxError::Unauthorized(format!("malformed bearer token: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(CruxError::Unauthorized(format!(
                "unsupported token algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| CruxError::Unauthorized("token has no key id".to_string()))?;

        let key = self.keys.decoding_key(&kid).await?;
        let data = decode::<Claims>(token, &key, &self.validation)
            .map_err(|e| CruxError::Unauthorized(format!("token rejected: {e}")))?;
        Ok(data.claims)
    }
}

fn check_service_url(claims: &Claims, activity: &Activity) -> Result<()> {
    let claimed = match (&claims.serviceurl, claims.iss.as_str()) {
        (Some(claimed), _) => claimed,
        (None, CHANNEL_ISSUER) => {
            return Err(CruxError::Unauthorized(
                "channel token has no service url".to_string(),
            ))
        }
        (None, _) => return Ok(()),
    };

    let actual = activity.service_url.as_deref().unwrap_or("");
    if claimed.trim_end_matches('/') != actual.trim_end_matches('/') {
        return Err(CruxError::Unauthorized(
            "token service url does not match activity".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl ChannelAuthenticator for BotFrameworkAuthenticator {
    async fn authenticate(&self, auth_header: &str, activity: &Activity) -> Result<()> {
        let auth_header = auth_header.trim();

        if auth_header.is_empty() {
            if self.app_id.is_empty() {
                debug!("No app id configured, accepting unauthenticated request");
                return Ok(());
            }
            return Err(CruxError::Unauthorized(
                "missing Authorization header".to_string(),
            ));
        }

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| CruxError::Unauthorized("expected a Bearer token".to_string()))?;

        let claims = self.verify(token.trim()).await?;
        check_service_url(&claims, activity)
    }
}
