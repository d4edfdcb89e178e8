//! NowWit HTTP API
//!
//! Axum-based HTTP server that turns a question/answer pair into an insight
//! card by way of the configured chat-completion model.
//!
//! Each endpoint has a thin axum handler that delegates to an inner function;
//! the inner functions are directly testable without axum dispatch.
//!
//! Endpoints:
//! - GET  /health  : liveness plus whether the model credential is configured
//! - GET  /version : server version info
//! - POST /insight : generate one card

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use nowwit_core::{CardGenerator, GeneratedCard, GenerationError, InsightResponse, NowwitConfig};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// The only failure text clients ever see for a 500.
pub const GENERIC_FAILURE: &str = "card generation failed, try again shortly";

pub const ANSWER_REQUIRED: &str = "answer is required";

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub config: NowwitConfig,
    /// `None` when the model credential is not configured.
    pub generator: Option<Arc<dyn CardGenerator>>,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/insight", post(insight_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: HttpState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);
    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("NowWit HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }

    fn into_value(self) -> serde_json::Value {
        serde_json::json!({ "error": self.error })
    }
}

/// Validated `POST /insight` input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightRequest {
    pub question: String,
    pub answer: String,
}

impl InsightRequest {
    /// `answer` must be a string with visible content; a missing or
    /// non-string `question` is read as empty.
    pub fn from_json(payload: &serde_json::Value) -> Option<Self> {
        let answer = payload.get("answer")?.as_str()?;
        if answer.trim().is_empty() {
            return None;
        }
        let question = payload
            .get("question")
            .and_then(|q| q.as_str())
            .unwrap_or_default();
        Some(Self {
            question: question.to_string(),
            answer: answer.to_string(),
        })
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health: reports whether generation can work at all.
pub fn health_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::OK,
        serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "model": state.config.model.model,
            "configured": state.generator.is_some(),
        }),
    )
}

/// Inner version: returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "nowwit/1",
    })
}

/// Inner insight: checks configuration, validates input, calls the model
/// and stamps the result. Failure detail is logged, never returned.
pub async fn insight_inner(
    generator: Option<&dyn CardGenerator>,
    payload: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let generator = match generator {
        Some(g) => g,
        None => {
            tracing::error!(
                kind = GenerationError::MissingApiKey.kind(),
                "{}",
                GenerationError::MissingApiKey
            );
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(GENERIC_FAILURE).into_value(),
            );
        }
    };

    let req = match InsightRequest::from_json(payload) {
        Some(r) => r,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(ANSWER_REQUIRED).into_value(),
            );
        }
    };

    let start = Instant::now();
    match generator.generate(&req.question, &req.answer).await {
        Ok(insight) => {
            let card = GeneratedCard::stamp(insight);
            tracing::info!(
                id = %card.id,
                concept = %card.insight.concept,
                rarity = %card.insight.rarity,
                took_ms = start.elapsed().as_millis() as u64,
                "Insight card generated"
            );
            match serde_json::to_value(InsightResponse { card }) {
                Ok(body) => (StatusCode::OK, body),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize insight card");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::new(GENERIC_FAILURE).into_value(),
                    )
                }
            }
        }
        Err(e) => {
            tracing::error!(
                kind = e.kind(),
                error = %e,
                backend = generator.name(),
                "Insight generation failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(GENERIC_FAILURE).into_value(),
            )
        }
    }
}

// ============================================================================
// Axum handler wrappers (thin: delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state);
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn insight_handler(
    State(state): State<Arc<HttpState>>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> impl IntoResponse {
    // an unparseable body carries no answer
    let payload = match payload {
        Ok(Json(v)) => v,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected insight body");
            serde_json::Value::Null
        }
    };
    let (status, body) = insight_inner(state.generator.as_deref(), &payload).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================
