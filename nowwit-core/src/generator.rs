//! Prompted card generation against a hosted chat-completion model.
//!
//! Provides a `CardGenerator` trait and `ChatCompletionClient`, which calls an
//! OpenAI-compatible `/chat/completions` endpoint (FLock by default) with a
//! fixed system instruction and validates the single JSON object it returns.
//! No retries: a failed generation is surfaced once and the user re-triggers.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::ModelConfig;
use crate::models::{Insight, InsightValidationError};

/// Header the FLock gateway reads the credential from.
pub const API_KEY_HEADER: &str = "x-litellm-api-key";

pub const SYSTEM_PROMPT: &str = r#"You generate cards for NowWit, an emotion-based Web3 learning app.

INPUT: a JSON object with a "question" and the user's "answer" (usually Korean).

TASK:
Pick exactly ONE real Web3/blockchain concept whose feel matches the emotional tone of the answer.
Choose only well-known concepts (Layer2 and scaling, cryptography, protocol mechanisms,
decentralization, privacy, MEV and transaction flow, infrastructure and tooling, governance,
security, token economics, UX, or emerging trends you are certain about).
Never invent concepts, projects or URLs. When unsure, prefer a more general, reliable concept.

RARITY by difficulty of the concept:
- easy -> "Common"
- medium -> "Rare"
- hard -> "Epic"
- very hard / research level -> "Mythic"

PROJECT:
Name one real Base ecosystem project or real blockchain project tied to the concept, with its
real official URL. If unsure, use "baseProject": "Base Ecosystem" and
"baseUrl": "https://www.base.org/ecosystem".

OUTPUT: exactly one JSON object and nothing else, with these keys:
{
  "spiritName": "short title, 2-4 words",
  "emoji": "one emoji",
  "rarity": "Common | Rare | Epic | Mythic",
  "concept": "the Web3 concept",
  "conceptDescription": "2-3 sentence explanation in Korean",
  "baseProject": "real project name",
  "baseUrl": "real official URL",
  "story": "2-3 sentence story in Korean linking the answer to the concept"
}
All explanatory text must be Korean. No markdown, no text outside the JSON object."#;

// ============================================================================
// CardGenerator trait
// ============================================================================

/// Turns a question/answer pair into a validated insight.
#[async_trait]
pub trait CardGenerator: Send + Sync {
    async fn generate(&self, question: &str, answer: &str) -> Result<Insight, GenerationError>;

    /// Model or backend name for logging and health output.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Missing API key ({} is not set)", crate::config::API_KEY_ENV)]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Upstream error ({code}): {message}")]
    Upstream { code: u16, message: String },

    #[error("Malformed model output: {0}")]
    MalformedModelOutput(#[from] InsightValidationError),
}

impl GenerationError {
    /// Taxonomy label used in operator logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::MissingApiKey => "ConfigurationError",
            GenerationError::Http(_) | GenerationError::Upstream { .. } => "UpstreamError",
            GenerationError::Timeout(_) => "Timeout",
            GenerationError::MalformedModelOutput(_) => "MalformedModelOutput",
        }
    }
}

// ============================================================================
// Chat-completion wire structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct UserPayload<'a> {
    question: &'a str,
    answer: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatResponse {
    /// `choices[0].message.content`, or empty when any part is missing.
    fn into_content(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default()
    }
}

// ============================================================================
// ChatCompletionClient
// ============================================================================

/// Chat model client configuration.
#[derive(Debug, Clone)]
pub struct ChatModelConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl ChatModelConfig {
    pub fn new(api_key: Option<String>, model: &ModelConfig) -> Self {
        let api_key = api_key
            .or_else(crate::config::NowwitConfig::api_key)
            .unwrap_or_default();

        Self {
            api_key,
            model: model.model.clone(),
            max_tokens: model.max_tokens,
            temperature: model.temperature,
            timeout: Duration::from_secs(model.timeout_seconds),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    client: Client,
    config: ChatModelConfig,
    base_url: String,
}

impl ChatCompletionClient {
    /// Create a client against a custom base URL (any OpenAI-compatible gateway, or a mock).
    pub fn with_base_url(
        config: ChatModelConfig,
        base_url: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        if config.api_key.trim().is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            config,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_model_config(
        model: &ModelConfig,
        api_key: Option<String>,
    ) -> Result<Self, GenerationError> {
        Self::with_base_url(ChatModelConfig::new(api_key, model), model.base_url.clone())
    }

    fn build_request<'a>(&'a self, question: &str, answer: &str) -> ChatRequest<'a> {
        let user = serde_json::to_string(&UserPayload { question, answer })
            .unwrap_or_else(|_| String::new());

        ChatRequest {
            model: &self.config.model,
            stream: false,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        }
    }

    fn map_transport(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout(self.config.timeout)
        } else {
            GenerationError::Http(e)
        }
    }

    /// One round trip: request, status check, content extraction, validation.
    pub async fn complete(&self, question: &str, answer: &str) -> Result<Insight, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = self.build_request(question, answer);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_transport(e))?;

        if !status.is_success() {
            tracing::error!(code = status.as_u16(), body = %body, "Chat completion API error");
            return Err(GenerationError::Upstream {
                code: status.as_u16(),
                message: body,
            });
        }

        let content = serde_json::from_str::<ChatResponse>(&body)
            .map(ChatResponse::into_content)
            .map_err(|e| {
                tracing::error!(error = %e, "Chat completion envelope is not valid JSON");
                InsightValidationError::NotJson(e.to_string())
            })?;

        Insight::from_model_output(&content).map_err(|e| {
            tracing::warn!(error = %e, content = %content, "Model returned an unusable card");
            GenerationError::MalformedModelOutput(e)
        })
    }
}

#[async_trait]
impl CardGenerator for ChatCompletionClient {
    async fn generate(&self, question: &str, answer: &str) -> Result<Insight, GenerationError> {
        self.complete(question, answer).await
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

// ============================================================================
// TESTS
// ============================================================================
