//! Ollama backend implementation
//!
//! HTTP client for the Ollama API. Uses the prompt library for customizable
//! prompts and asks Ollama for JSON-constrained output.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::prompts::PromptLibrary;

use super::parsing::parse_extraction;
use super::types::LlmExtraction;
use super::{render_utterance_prompt, AIBackend};

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
    }

    /// Use a specific prompt library (tests use embedded prompts only)
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(RwLock::new(prompts));
        self
    }
}

/// Request to Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    format: &'static str,
    stream: bool,
}

/// Response from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl AIBackend for OllamaBackend {
    async fn interpret_utterance(
        &self,
        utterance: &str,
        today: NaiveDate,
    ) -> Result<LlmExtraction> {
        let rendered = render_utterance_prompt(&self.prompts, utterance, today)?;

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: rendered.user,
            system: rendered.system,
            format: "json",
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!(
                "Ollama API error {}: {}",
                status, body
            )));
        }

        let ollama_response: OllamaResponse = response.json().await?;
        debug!("Ollama response: {}", ollama_response.response);

        parse_extraction(&ollama_response.response)
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::LlmIntent;
    use crate::test_utils::{MockBehavior, MockOllamaServer};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 20).unwrap()
    }

    fn backend(url: &str) -> OllamaBackend {
        OllamaBackend::new(url, "llama3.2").with_prompts(PromptLibrary::embedded_only())
    }

    #[test]
    fn test_backend_new_trims_trailing_slash() {
        let backend = OllamaBackend::new("http://localhost:11434/", "llama3.2");
        assert_eq!(backend.host(), "http://localhost:11434");
        assert_eq!(backend.model(), "llama3.2");
    }

    #[test]
    fn test_request_serialization() {
        let request = OllamaRequest {
            model: "llama3.2".to_string(),
            prompt: "Câu chat: \"ăn phở 35k\"".to_string(),
            system: None,
            format: "json",
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
        assert!(json.get("system").is_none());
    }

    #[tokio::test]
    async fn test_interpret_against_mock_server() {
        let server = MockOllamaServer::start().await;
        let backend = backend(&server.url());

        assert!(backend.health_check().await);
        let extraction = backend
            .interpret_utterance("trưa ăn phở 35k", today())
            .await
            .unwrap();
        assert_eq!(extraction.intent, LlmIntent::AddExpense);
        assert_eq!(extraction.expense.unwrap().food_item, "phở");
    }

    #[tokio::test]
    async fn test_garbage_response_is_invalid_data() {
        let server = MockOllamaServer::with_behavior(MockBehavior::Garbage).await;
        let err = backend(&server.url())
            .interpret_utterance("trưa ăn phở 35k", today())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockOllamaServer::with_behavior(MockBehavior::ServerError).await;
        let err = backend(&server.url())
            .interpret_utterance("trưa ăn phở 35k", today())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let backend = OllamaBackend::new("http://127.0.0.1:1", "llama3.2");
        assert!(!backend.health_check().await);
    }
}
