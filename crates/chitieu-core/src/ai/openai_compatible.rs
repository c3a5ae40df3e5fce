//! OpenAI-compatible backend implementation
//!
//! Works with any server that implements the OpenAI chat completions API:
//! - vLLM (http://localhost:8000)
//! - LocalAI / llama-server (http://localhost:8080)
//! - Docker Model Runner (http://localhost:12434)
//! - Gemini's OpenAI endpoint (https://generativelanguage.googleapis.com/v1beta/openai)
//!
//! # Configuration
//!
//! `[llm] backend = "openai_compatible"` with `host`, `model` and
//! `api_key_env`, or the `OPENAI_COMPATIBLE_HOST`, `OPENAI_COMPATIBLE_MODEL`
//! and `OPENAI_COMPATIBLE_API_KEY` environment variables.

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

/// OpenAI-compatible backend
#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl OpenAICompatibleBackend {
    /// Create a new OpenAI-compatible backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
    }

    /// Attach an API key sent as a bearer token
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    /// Use a specific prompt library (tests use embedded prompts only)
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(RwLock::new(prompts));
        self
    }

    /// Completions URL; hosts that already end in a version segment
    /// (".../v1beta/openai") take the path as is
    fn completions_url(&self) -> String {
        if self.base_url.ends_with("/openai") {
            format!("{}/chat/completions", self.base_url)
        } else {
            format!("{}/v1/chat/completions", self.base_url)
        }
    }

    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(0.1),
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
            stream: false,
        };

        let mut req_builder = self.http_client.post(self.completions_url()).json(&request);

        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!(
                "OpenAI API error {}: {}",
                status, body
            )));
        }

        let chat_response: ChatCompletionResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::InvalidData("No response from OpenAI API".into()))
    }
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl AIBackend for OpenAICompatibleBackend {
    async fn interpret_utterance(
        &self,
        utterance: &str,
        today: NaiveDate,
    ) -> Result<LlmExtraction> {
        let rendered = render_utterance_prompt(&self.prompts, utterance, today)?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = rendered.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: rendered.user,
        });

        let content = self.chat_completion(messages).await?;
        debug!("OpenAI-compatible response: {}", content);

        parse_extraction(&content)
    }

    async fn health_check(&self) -> bool {
        // Try /v1/models first (standard OpenAI endpoint)
        if let Ok(resp) = self
            .http_client
            .get(format!("{}/v1/models", self.base_url))
            .send()
            .await
        {
            if resp.status().is_success() {
                return true;
            }
        }

        // Try /health (LocalAI, Docker Model Runner)
        if let Ok(resp) = self
            .http_client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
        {
            if resp.status().is_success() {
                return true;
            }
        }

        false
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

    #[test]
    fn test_backend_with_api_key() {
        let backend =
            OpenAICompatibleBackend::new("http://localhost:8000/", "qwen2.5").with_api_key("sk-test");
        assert_eq!(backend.host(), "http://localhost:8000");
        assert_eq!(backend.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_completions_url() {
        let local = OpenAICompatibleBackend::new("http://localhost:8000", "m");
        assert_eq!(local.completions_url(), "http://localhost:8000/v1/chat/completions");

        let gemini = OpenAICompatibleBackend::new(
            "https://generativelanguage.googleapis.com/v1beta/openai/",
            "gemini-2.0-flash",
        );
        assert_eq!(
            gemini.completions_url(),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatCompletionRequest {
            model: "qwen2.5".to_string(),
            messages: vec![ChatMessage {
                role: "user",
                content: "ăn phở 35k".to_string(),
            }],
            temperature: Some(0.1),
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[tokio::test]
    async fn test_interpret_against_mock_server() {
        let server = MockOllamaServer::start().await;
        let backend = OpenAICompatibleBackend::new(&server.url(), "mock-model")
            .with_prompts(PromptLibrary::embedded_only());

        assert!(backend.health_check().await);
        let extraction = backend
            .interpret_utterance("trưa ăn phở 35k", today())
            .await
            .unwrap();
        assert_eq!(extraction.intent, LlmIntent::AddExpense);
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockOllamaServer::with_behavior(MockBehavior::ServerError).await;
        let backend = OpenAICompatibleBackend::new(&server.url(), "mock-model")
            .with_prompts(PromptLibrary::embedded_only());
        let err = backend
            .interpret_utterance("trưa ăn phở 35k", today())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("OpenAI API error 500"));
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let backend = OpenAICompatibleBackend::new("http://127.0.0.1:1", "m");
        assert!(!backend.health_check().await);
    }
}
