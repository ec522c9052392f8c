//! In-memory collaborators shared by the integration tests
#![allow(dead_code)]

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use crux_bot::bot::TurnHandler;
use crux_bot::channel::BotFrameworkAuthenticator;
use crux_bot::channel::SigningKeys;
use crux_bot::channel::ReplySender;
use crux_bot::embeddings::Embedder;
use crux_bot::embeddings::EmbeddingVector;
use crux_bot::llm::AnswerGenerator;
use crux_bot::llm::ChatMessage;
use crux_bot::llm::ChatModel;
use crux_bot::models::Activity;
use crux_bot::rag::DocumentStore;
use crux_bot::rag::MatchParams;
use crux_bot::rag::RetrievedContext;
use crux_bot::CruxError;
use crux_bot::Result;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::Algorithm;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use serde_json::json;
use serde_json::Value;

pub const SIGNING_KEY: &str = include_str!("../fixtures/signing.pem");
pub const OTHER_KEY: &str = include_str!("../fixtures/other.pem");
pub const JWKS: &str = include_str!("../fixtures/jwks.json");
pub const KID: &str = "test-key-1";

#[derive(Default)]
pub struct FakeEmbedder {
    pub fail_with: Option<String>,
    pub calls: AtomicUsize,
    pub inputs: Mutex<Vec<String>>,
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(text.to_string());
        match &self.fail_with {
            Some(msg) => Err(CruxError::HttpError(msg.clone())),
            None => Ok(vec![0.1, 0.2, 0.3]),
        }
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub content: Option<String>,
    pub fail_with: Option<String>,
    pub calls: AtomicUsize,
    pub params: Mutex<Vec<MatchParams>>,
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn retrieve(&self, _query: &[f32], params: MatchParams) -> Result<RetrievedContext> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.params.lock().unwrap().push(params);
        if let Some(msg) = &self.fail_with {
            return Err(CruxError::RetrievalError(msg.clone()));
        }
        Ok(match &self.content {
            Some(content) => RetrievedContext::found(content.clone()),
            None => RetrievedContext::none(),
        })
    }
}

#[derive(Default)]
pub struct FakeModel {
    pub answer: Option<String>,
    pub fail_with: Option<String>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

#[async_trait]
impl ChatModel for FakeModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(messages.to_vec());
        match &self.fail_with {
            Some(msg) => Err(CruxError::LlmError(msg.clone())),
            None => Ok(self.answer.clone()),
        }
    }
}

#[derive(Default)]
pub struct RecordingSender {
    pub fail: bool,
    pub replies: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    /// `(conversation id, text)` of each reply sent
    pub fn sent(&self) -> Vec<(String, String)> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplySender for RecordingSender {
    async fn send_reply(&self, inbound: &Activity, text: &str) -> Result<()> {
        if self.fail {
            return Err(CruxError::ChannelError("connector unavailable".to_string()));
        }
        self.replies
            .lock()
            .unwrap()
            .push((inbound.conversation_id().to_string(), text.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub embedder: Arc<FakeEmbedder>,
    pub store: Arc<FakeStore>,
    pub model: Arc<FakeModel>,
    pub sender: Arc<RecordingSender>,
}

impl Harness {
    pub fn new(embedder: FakeEmbedder, store: FakeStore, model: FakeModel) -> Self {
        Self {
            embedder: Arc::new(embedder),
            store: Arc::new(store),
            model: Arc::new(model),
            sender: Arc::new(RecordingSender::default()),
        }
    }

    /// Everything succeeds with the given document and answer
    pub fn answering(content: Option<&str>, answer: Option<&str>) -> Self {
        Self::new(
            FakeEmbedder::default(),
            FakeStore {
                content: content.map(str::to_string),
                ..FakeStore::default()
            },
            FakeModel {
                answer: answer.map(str::to_string),
                ..FakeModel::default()
            },
        )
    }

    pub fn handler(&self) -> TurnHandler {
        TurnHandler::new(
            self.embedder.clone(),
            self.store.clone(),
            AnswerGenerator::new(self.model.clone()),
            MatchParams::default(),
        )
    }

    pub fn remote_calls(&self) -> usize {
        self.embedder.calls.load(Ordering::SeqCst)
            + self.store.calls.load(Ordering::SeqCst)
            + self.model.calls.load(Ordering::SeqCst)
    }
}

pub fn message(text: &str) -> Activity {
    serde_json::from_value(serde_json::json!({
        "type": "message",
        "id": "act-1",
        "serviceUrl": "https://smba.example.net/",
        "channelId": "emulator",
        "from": { "id": "user-1" },
        "recipient": { "id": "bot-1" },
        "conversation": { "id": "conv-1" },
        "text": text
    }))
    .unwrap()
}

pub fn activity_of_type(activity_type: &str) -> Activity {
    let mut activity = message("");
    activity.activity_type = activity_type.to_string();
    activity.text = None;
    activity
}

pub fn authenticator(app_id: &str) -> BotFrameworkAuthenticator {
    let keys: JwkSet = serde_json::from_str(JWKS).unwrap();
    BotFrameworkAuthenticator::new(app_id, SigningKeys::fixed(keys))
}

/// Channel claims for `app-id`, valid for an hour and bound to `service_url`
pub fn channel_claims(service_url: &str) -> Value {
    json!({
        "aud": "app-id",
        "iss": "https://api.botframework.com",
        "exp": chrono::Utc::now().timestamp() + 3600,
        "serviceurl": service_url
    })
}

/// `Bearer` header carrying `claims` signed with `pem` under the fixture key id
pub fn bearer(claims: &Value, pem: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
    format!("Bearer {}", jsonwebtoken::encode(&header, claims, &key).unwrap())
}

/// `Bearer` header with an `alg: none` token and a placeholder signature
pub fn unsigned_bearer(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("Bearer {header}.{payload}.AAAA")
}
