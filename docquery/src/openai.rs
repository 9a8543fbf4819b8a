//! OpenAI-compatible embedding and chat-completion providers.
//!
//! One [`OpenAiClient`] implements both capability traits against a single
//! endpoint, so the usual wiring is a shared `Arc<OpenAiClient>` for the
//! whole pipeline. The API key is always injected through [`OpenAiConfig`];
//! nothing in this crate reads or stores credentials on its own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::embeddings::EmbeddingProvider;
use crate::generation::GenerationProvider;
use crate::types::ProviderError;

/// Connection settings for an OpenAI-compatible API.
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub api_base: Url,
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base.as_str())
            .field("embedding_model", &self.embedding_model)
            .field("chat_model", &self.chat_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiConfig {
    pub const DEFAULT_API_BASE: &'static str = "https://api.openai.com/v1";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: Url::parse(Self::DEFAULT_API_BASE).expect("default API base parses"),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            max_tokens: 1000,
            timeout: Duration::from_secs(30),
        }
    }

    /// Reads `OPENAI_API_KEY` (and, when set and parseable,
    /// `OPENAI_API_BASE`) from the environment. Returns `None` when no key
    /// is present.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok()?;
        let mut config = Self::new(api_key);
        if let Some(base) = std::env::var("OPENAI_API_BASE")
            .ok()
            .and_then(|raw| Url::parse(&raw).ok())
        {
            config.api_base = base;
        }
        Some(config)
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = api_base;
        self
    }

    #[must_use]
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    #[must_use]
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP client implementing both capability traits against one endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn endpoint(&self, leaf: &str) -> String {
        format!(
            "{}/{leaf}",
            self.config.api_base.as_str().trim_end_matches('/')
        )
    }

    async fn post_json<R>(&self, leaf: &str, body: &impl Serialize) -> Result<R, ProviderError>
    where
        R: serde::de::DeserializeOwned,
    {
        let response = self
            .http
            .post(self.endpoint(leaf))
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.timeout)
            .json(body)
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Service {
                status: status.as_u16(),
                message: service_message(&body),
            });
        }
        response
            .json::<R>()
            .await
            .map_err(|err| ProviderError::MalformedResponse(err.to_string()))
    }
}

/// Pulls the human-readable message out of an error body, falling back to
/// the raw body (truncated) when it is not the documented shape.
fn service_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.trim().chars().take(200).collect(),
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingObject>,
}

#[derive(Deserialize)]
struct EmbeddingObject {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingsRequest {
            model: &self.config.embedding_model,
            input: texts,
        };
        let mut response: EmbeddingsResponse = self.post_json("embeddings", &request).await?;
        if response.data.len() != texts.len() {
            return Err(ProviderError::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }
        // the service reports each vector's position; don't trust arrival order
        response.data.sort_by_key(|item| item.index);
        Ok(response
            .data
            .into_iter()
            .map(|item| item.embedding)
            .collect())
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[async_trait]
impl GenerationProvider for OpenAiClient {
    async fn generate(
        &self,
        system_prompt: &str,
        context: &[String],
        question: &str,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_content(context, question),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        let mut response: ChatResponse = self.post_json("chat/completions", &request).await?;
        if response.choices.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "response contained no choices".to_string(),
            ));
        }
        Ok(response.choices.remove(0).message.content)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Stuffs the retrieved context ahead of the question in a single user turn.
fn user_content(context: &[String], question: &str) -> String {
    if context.is_empty() {
        return format!("Question: {question}");
    }
    format!("Context:\n{}\n\nQuestion: {question}", context.join("\n\n"))
}
