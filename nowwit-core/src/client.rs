//! Client side of `POST /insight`.
//!
//! `InsightClient` sends the question/answer pair to a NowWit server and turns
//! the stamped card it returns into a full [`Card`]. Blank answers are refused
//! locally and never reach the network.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::models::{Card, InsightResponse};

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("answer is required")]
    EmptyAnswer,

    #[error("card generation failed ({status}): {message}")]
    GenerationFailed { status: u16, message: String },

    #[error("card generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from server: {0}")]
    InvalidResponse(String),
}

/// Anything that can produce a card for a question/answer pair. The card is
/// returned, not stored.
#[async_trait]
pub trait RemoteCardGenerator: Send + Sync {
    async fn generate(&self, question: &str, answer: &str) -> Result<Card, InsightError>;
}

#[derive(Debug, Serialize)]
struct InsightRequest<'a> {
    question: &'a str,
    answer: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InsightClient {
    client: Client,
    server_url: String,
    timeout: Duration,
}

impl InsightClient {
    pub fn new(server_url: impl Into<String>, timeout: Duration) -> Result<Self, InsightError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            server_url: server_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, InsightError> {
        Self::new(
            config.server_url.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn map_transport(&self, e: reqwest::Error) -> InsightError {
        if e.is_timeout() {
            InsightError::Timeout(self.timeout)
        } else {
            InsightError::Http(e)
        }
    }

    /// `GET /health` as raw JSON.
    pub async fn health(&self) -> Result<serde_json::Value, InsightError> {
        let url = format!("{}/health", self.server_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(InsightError::GenerationFailed {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        resp.json()
            .await
            .map_err(|e| InsightError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl RemoteCardGenerator for InsightClient {
    async fn generate(&self, question: &str, answer: &str) -> Result<Card, InsightError> {
        if answer.trim().is_empty() {
            return Err(InsightError::EmptyAnswer);
        }

        let url = format!("{}/insight", self.server_url);
        let resp = self
            .client
            .post(&url)
            .json(&InsightRequest { question, answer })
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.map_transport(e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or(body);
            tracing::warn!(status = status.as_u16(), message = %message, "Insight request failed");
            return Err(InsightError::GenerationFailed {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: InsightResponse = serde_json::from_str(&body)
            .map_err(|e| InsightError::InvalidResponse(e.to_string()))?;
        parsed
            .card
            .insight
            .validate()
            .map_err(|e| InsightError::InvalidResponse(e.to_string()))?;

        Ok(parsed.card.into_card(question, answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rarity;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn server_card() -> serde_json::Value {
        serde_json::json!({
            "card": {
                "id": "5f8d0a4e-3b7c-4a57-9d1e-2c9e7f1b6a10",
                "createdAt": "2026-10-17T05:12:00.000Z",
                "spiritName": "Night Validator",
                "emoji": "🌙",
                "rarity": "Mythic",
                "concept": "Zero-Knowledge Proof",
                "conceptDescription": "정보를 드러내지 않고 참임을 증명하는 암호 기법이에요.",
                "baseProject": "Base Ecosystem",
                "baseUrl": "https://www.base.org/ecosystem",
                "story": "말하지 않아도 알 수 있는 마음처럼요."
            }
        })
    }

    fn client_for(server: &MockServer) -> InsightClient {
        InsightClient::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_generate_appends_question_and_answer() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/insight"))
            .and(body_json(serde_json::json!({
                "question": "오늘의 기분은 어때?",
                "answer": "조용하고 차분해"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(server_card()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let card = client_for(&mock_server)
            .generate("오늘의 기분은 어때?", "조용하고 차분해")
            .await
            .unwrap();

        assert_eq!(card.id, "5f8d0a4e-3b7c-4a57-9d1e-2c9e7f1b6a10");
        assert_eq!(card.question, "오늘의 기분은 어때?");
        assert_eq!(card.answer, "조용하고 차분해");
        assert_eq!(card.insight.rarity, Rarity::Mythic);
    }

    #[tokio::test]
    async fn test_blank_answer_never_issues_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(server_card()))
            .expect(0)
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server).generate("q", "   \n").await.unwrap_err();
        assert!(matches!(err, InsightError::EmptyAnswer));
    }

    #[tokio::test]
    async fn test_server_error_surfaces_message() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": "card generation failed, try again shortly"
            })))
            .mount(&mock_server)
            .await;

        match client_for(&mock_server).generate("q", "a").await {
            Err(InsightError::GenerationFailed { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "card generation failed, try again shortly");
            }
            other => panic!("Expected GenerationFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_incomplete_card_is_rejected() {
        let mock_server = MockServer::start().await;
        let mut body = server_card();
        body["card"].as_object_mut().unwrap().remove("story");
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server).generate("q", "a").await.unwrap_err();
        assert!(matches!(err, InsightError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(server_card())
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let client = InsightClient::new(mock_server.uri(), Duration::from_millis(100)).unwrap();
        let err = client.generate("q", "a").await.unwrap_err();
        assert!(matches!(err, InsightError::Timeout(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_health_returns_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "healthy"})),
            )
            .mount(&mock_server)
            .await;

        let body = client_for(&mock_server).health().await.unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[test]
    fn test_server_url_trailing_slash_trimmed() {
        let client = InsightClient::new("http://localhost:8787/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.server_url(), "http://localhost:8787");
    }
}
