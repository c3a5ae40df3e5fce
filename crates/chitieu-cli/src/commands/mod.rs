//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (config, open_db, open_tracker) and init
//! - `entries` - Chat-message commands (say, add, delete, balance) and outcome rendering
//! - `chat` - Interactive chat session
//! - `reports` - Statistics and recent transactions
//! - `sync` - Spreadsheet sync commands (push, export, test)
//! - `llm` - Language-model backend test
//! - `prompts` - Prompt library management commands

pub mod chat;
pub mod core;
pub mod entries;
pub mod llm;
pub mod prompts;
pub mod reports;
pub mod sync;

// Re-export command functions for main.rs
pub use chat::*;
pub use self::core::*;
pub use entries::*;
pub use llm::*;
pub use prompts::*;
pub use reports::*;
pub use sync::*;
