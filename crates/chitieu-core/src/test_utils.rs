//! Test utilities for chitieu-core
//!
//! A mock language-model server speaking both the Ollama and the
//! OpenAI-compatible protocols, with scriptable misbehavior (garbage output,
//! slow replies, server errors) for exercising the rule-based fallback.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

use crate::ai::{ExpenseFields, LlmExtraction, LlmIntent};

/// How the mock server answers generation requests
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Answer with this extraction as JSON
    Reply(LlmExtraction),
    /// Answer 200 with text that is not JSON
    Garbage,
    /// Wait before answering with the default extraction
    Slow(Duration),
    /// Answer 500
    ServerError,
}

/// The extraction served by default: "trưa ăn phở 35k"
pub fn sample_extraction() -> LlmExtraction {
    LlmExtraction {
        expense: Some(ExpenseFields {
            food_item: "phở".to_string(),
            price: Some(35_000.0),
            meal_time: Some("noon".to_string()),
            transaction_type: Some("expense".to_string()),
            account_type: Some("cash".to_string()),
            ..ExpenseFields::default()
        }),
        ..LlmExtraction::bare(LlmIntent::AddExpense, 0.95)
    }
}

/// Mock language-model server for tests
pub struct MockOllamaServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOllamaServer {
    /// Start a server that replies with [`sample_extraction`]
    pub async fn start() -> Self {
        Self::with_behavior(MockBehavior::Reply(sample_extraction())).await
    }

    /// Start a server with the given behavior on an available port
    pub async fn with_behavior(behavior: MockBehavior) -> Self {
        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat))
            .with_state(Arc::new(behavior));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOllamaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    model: String,
}

/// Produce the model text for a behavior, or an error status
async fn model_text(behavior: &MockBehavior) -> Result<String, StatusCode> {
    match behavior {
        MockBehavior::Reply(extraction) => {
            Ok(serde_json::to_string(extraction).unwrap_or_default())
        }
        MockBehavior::Garbage => Ok("Xin lỗi, tôi không chắc câu này nói gì.".to_string()),
        MockBehavior::Slow(delay) => {
            tokio::time::sleep(*delay).await;
            Ok(serde_json::to_string(&sample_extraction()).unwrap_or_default())
        }
        MockBehavior::ServerError => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

async fn handle_tags() -> Json<serde_json::Value> {
    Json(json!({
        "models": [{"name": "llama3.2:latest", "size": 2_000_000_000u64}]
    }))
}

async fn handle_models() -> Json<serde_json::Value> {
    Json(json!({"object": "list", "data": [{"id": "mock-model", "object": "model"}]}))
}

async fn handle_generate(
    State(behavior): State<Arc<MockBehavior>>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    match model_text(&behavior).await {
        Ok(text) => Json(json!({
            "model": request.model,
            "response": text,
            "done": true
        }))
        .into_response(),
        Err(status) => (status, "model crashed").into_response(),
    }
}

async fn handle_chat(
    State(behavior): State<Arc<MockBehavior>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    match model_text(&behavior).await {
        Ok(text) => Json(json!({
            "model": request.model,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": text},
                "finish_reason": "stop"
            }]
        }))
        .into_response(),
        Err(status) => (status, "model crashed").into_response(),
    }
}
