//! Pluggable language-model backend abstraction
//!
//! The interpreter asks a model to classify an utterance and extract its
//! fields in one call. Backends are interchangeable:
//!
//! - `AIBackend` trait: the interface every backend implements
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OllamaBackend`, `OpenAICompatibleBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Built from [`LlmConfig`](crate::config::LlmConfig), which already has the
//! `AI_BACKEND`, `OLLAMA_*` and `OPENAI_COMPATIBLE_*` environment overrides
//! applied. The OpenAI-compatible backend also covers hosted endpoints such
//! as Gemini's OpenAI surface.

mod mock;
mod ollama;
mod openai_compatible;
pub mod parsing;
pub mod types;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use openai_compatible::OpenAICompatibleBackend;
pub use types::*;

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::config::{BackendKind, LlmConfig};
use crate::error::{Error, Result};
use crate::prompts::{PromptId, PromptLibrary};

/// Trait defining the interface for all language-model backends
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Classify an utterance and extract its fields
    async fn interpret_utterance(&self, utterance: &str, today: NaiveDate)
        -> Result<LlmExtraction>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Model name (for logging)
    fn model(&self) -> &str;

    /// Host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// OpenAI-compatible backend (vLLM, LocalAI, llama-server, Gemini, etc.)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create a client from resolved config
    ///
    /// Returns None when the backend is `none` (rules only).
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        match config.backend {
            BackendKind::Ollama => Some(AIClient::Ollama(OllamaBackend::new(
                &config.host,
                &config.model,
            ))),
            BackendKind::OpenAICompatible => {
                let mut backend = OpenAICompatibleBackend::new(&config.host, &config.model);
                if let Some(key) = config.api_key() {
                    backend = backend.with_api_key(&key);
                }
                Some(AIClient::OpenAICompatible(backend))
            }
            BackendKind::Mock => Some(AIClient::Mock(MockBackend::new())),
            BackendKind::None => None,
        }
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock(backend: MockBackend) -> Self {
        AIClient::Mock(backend)
    }

    /// Backend name for display
    pub fn backend_name(&self) -> &'static str {
        match self {
            AIClient::Ollama(_) => "ollama",
            AIClient::OpenAICompatible(_) => "openai_compatible",
            AIClient::Mock(_) => "mock",
        }
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn interpret_utterance(
        &self,
        utterance: &str,
        today: NaiveDate,
    ) -> Result<LlmExtraction> {
        match self {
            AIClient::Ollama(b) => b.interpret_utterance(utterance, today).await,
            AIClient::OpenAICompatible(b) => b.interpret_utterance(utterance, today).await,
            AIClient::Mock(b) => b.interpret_utterance(utterance, today).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.model(),
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.host(),
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

/// Rendered system and user messages for one utterance
pub(crate) struct RenderedPrompt {
    pub system: Option<String>,
    pub user: String,
}

/// Render the utterance prompt from a shared library
pub(crate) fn render_utterance_prompt(
    prompts: &RwLock<PromptLibrary>,
    utterance: &str,
    today: NaiveDate,
) -> Result<RenderedPrompt> {
    let mut prompts = prompts
        .write()
        .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
    let template = prompts.get(PromptId::InterpretUtterance)?;

    let today = today.format("%Y-%m-%d").to_string();
    let mut vars = HashMap::new();
    vars.insert("utterance", utterance);
    vars.insert("today", today.as_str());

    Ok(RenderedPrompt {
        system: template.render_system(&vars),
        user: template.render_user(&vars),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn llm_config(backend: BackendKind) -> LlmConfig {
        LlmConfig {
            backend,
            host: "http://localhost:11434/".to_string(),
            model: "qwen2.5".to_string(),
            api_key_env: None,
            timeout: Duration::from_secs(5),
            min_confidence: 0.6,
        }
    }

    #[test]
    fn test_from_config() {
        let client = AIClient::from_config(&llm_config(BackendKind::Ollama)).unwrap();
        assert_eq!(client.backend_name(), "ollama");
        assert_eq!(client.model(), "qwen2.5");
        assert_eq!(client.host(), "http://localhost:11434");

        let client = AIClient::from_config(&llm_config(BackendKind::OpenAICompatible)).unwrap();
        assert_eq!(client.backend_name(), "openai_compatible");

        assert!(AIClient::from_config(&llm_config(BackendKind::None)).is_none());
    }

    #[test]
    fn test_render_utterance_prompt() {
        let lib = RwLock::new(PromptLibrary::embedded_only());
        let today = NaiveDate::from_ymd_opt(2024, 10, 20).unwrap();
        let rendered = render_utterance_prompt(&lib, "trưa ăn phở 35k", today).unwrap();
        assert!(rendered.user.contains("\"trưa ăn phở 35k\""));
        assert!(rendered.system.unwrap().contains("2024-10-20"));
    }

    #[tokio::test]
    async fn test_mock_client_dispatch() {
        let client = AIClient::mock(MockBackend::new());
        assert!(client.health_check().await);
        assert_eq!(client.model(), "mock");
    }
}
