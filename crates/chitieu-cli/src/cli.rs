//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Chitieu - Log expenses by chatting in Vietnamese
#[derive(Parser)]
#[command(name = "chitieu")]
#[command(about = "Vietnamese chat-style expense logger", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file (defaults to the override location, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// User to act as (defaults to [user] name in config)
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Skip the language model and use the rule-based parser only
    #[arg(long, global = true)]
    pub offline: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Interpret a chat message and apply it ("trưa ăn phở 35k")
    Say {
        /// The message
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Record an expense or income, skipping intent detection
    Add {
        /// The expense ("bún chả 40k", "nhận lương 10 triệu")
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Delete a transaction (the most recent one when no text is given)
    Delete {
        /// Item, price or meal to match ("phở", "trưa 35k")
        text: Vec<String>,
    },

    /// Show balances, or update them ("tiền mặt 500k, tài khoản 2 triệu")
    Balance {
        /// Balance instruction; omit to show current balances
        text: Vec<String>,
    },

    /// Spending statistics
    Stats {
        /// Period: today, week, month, or days:N
        #[arg(short, long, default_value = "today")]
        period: String,

        /// Also show a per-day breakdown
        #[arg(long)]
        by_day: bool,

        /// Also show totals for the last N weeks
        #[arg(long)]
        weeks: Option<u32>,
    },

    /// List recent transactions
    Recent {
        /// Number of transactions to show
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },

    /// Interactive chat session (type 'thoát' or 'exit' to quit)
    Chat,

    /// Spreadsheet sync
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },

    /// Language-model backend commands
    Llm {
        #[command(subcommand)]
        action: LlmAction,
    },

    /// Manage prompt templates
    Prompts {
        #[command(subcommand)]
        action: PromptsAction,
    },
}

#[derive(Subcommand)]
pub enum SyncAction {
    /// Push unsynced transactions and the current balance
    Push,

    /// Write all transactions to a CSV file
    Export {
        /// Output file
        #[arg(short, long, default_value = "chitieu_export.csv")]
        file: PathBuf,
    },

    /// Check the configured destination is reachable
    Test,
}

#[derive(Subcommand)]
pub enum LlmAction {
    /// Check the backend and interpret a sample message
    Test {
        /// Message to interpret
        #[arg(short, long, default_value = "trưa ăn phở 35k")]
        text: String,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// Prompts the model stage uses, and which are overridden locally
    List,

    /// Print a prompt's system and user parts
    Show {
        /// Prompt name, such as interpret_utterance
        prompt_id: String,
    },

    /// Override directory and the file each prompt is read from
    Path,
}
