//! Chitieu Core Library
//!
//! Shared functionality for the chitieu Vietnamese expense logger:
//! - Utterance interpretation: language model first, rule-based fallback
//! - Pluggable language-model backends (Ollama, OpenAI-compatible, mock)
//! - Prompt library for customizable prompts
//! - SQLite storage for transactions and balances
//! - Spending statistics
//! - Spreadsheet sync (CSV file or Google Sheets)

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod interpret;
pub mod ledger;
pub mod models;
pub mod prompts;
pub mod sync;

/// Test utilities including mock language-model server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIBackend, AIClient, MockBackend, OllamaBackend, OpenAICompatibleBackend};
pub use config::{BackendKind, Config, LlmConfig, SyncConfig, SyncTarget};
pub use db::{Database, DEFAULT_USER};
pub use error::{Error, Result};
pub use interpret::{InterpretContext, Intent, Interpreter};
pub use ledger::{ExpenseTracker, Outcome, Processed};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use sync::{CsvDestination, SheetsDestination, SyncDestination, SyncReport, SyncService};
