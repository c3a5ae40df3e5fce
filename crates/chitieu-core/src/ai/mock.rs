//! Mock backend for testing
//!
//! Returns a scripted extraction, or an unclassified answer when nothing is
//! scripted, so the interpreter falls back to its rules. Useful for tests and
//! for running without a model server.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{Error, Result};

use super::types::{LlmExtraction, LlmIntent};
use super::AIBackend;

#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true; unhealthy mocks also fail
    /// every call like an unreachable server
    pub healthy: bool,
    /// Scripted answer
    pub response: Option<LlmExtraction>,
}

impl MockBackend {
    /// Create a new mock backend (healthy, nothing scripted)
    pub fn new() -> Self {
        Self {
            healthy: true,
            response: None,
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            response: None,
        }
    }

    /// Always answer with `response`
    pub fn with_response(response: LlmExtraction) -> Self {
        Self {
            healthy: true,
            response: Some(response),
        }
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn interpret_utterance(
        &self,
        _utterance: &str,
        _today: NaiveDate,
    ) -> Result<LlmExtraction> {
        if !self.healthy {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "mock backend is down",
            )));
        }
        Ok(self
            .response
            .clone()
            .unwrap_or_else(|| LlmExtraction::bare(LlmIntent::Unknown, 0.0)))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
