//! Chitieu CLI - Vietnamese chat-style expense logger
//!
//! Usage:
//!   chitieu say trưa ăn phở 35k      Log an expense from a chat message
//!   chitieu balance tiền mặt 500k    Update balances
//!   chitieu stats --period week      Spending statistics
//!   chitieu chat                     Interactive session

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use chitieu_core::Intent;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref(), cli.offline)?;
    let db_path = commands::resolve_db_path(cli.db.as_deref());
    let user = cli.user.as_deref();

    match cli.command {
        Commands::Init => commands::cmd_init(&db_path, &config),
        Commands::Say { text } => {
            let tracker = commands::open_tracker(&db_path, &config, user)?;
            commands::cmd_say(&tracker, &text.join(" ")).await
        }
        Commands::Add { text } => {
            let tracker = commands::open_tracker(&db_path, &config, user)?;
            commands::cmd_forced(&tracker, Intent::AddExpense, &text.join(" ")).await
        }
        Commands::Delete { text } => {
            let tracker = commands::open_tracker(&db_path, &config, user)?;
            commands::cmd_forced(&tracker, Intent::Delete, &text.join(" ")).await
        }
        Commands::Balance { text } => {
            let tracker = commands::open_tracker(&db_path, &config, user)?;
            if text.is_empty() {
                commands::cmd_balance_show(&tracker)
            } else {
                commands::cmd_forced(&tracker, Intent::UpdateBalance, &text.join(" ")).await
            }
        }
        Commands::Stats {
            period,
            by_day,
            weeks,
        } => {
            let tracker = commands::open_tracker(&db_path, &config, user)?;
            commands::cmd_stats(&tracker, &period, by_day, weeks)
        }
        Commands::Recent { limit } => {
            let tracker = commands::open_tracker(&db_path, &config, user)?;
            commands::cmd_recent(&tracker, limit)
        }
        Commands::Chat => {
            let tracker = commands::open_tracker(&db_path, &config, user)?;
            commands::cmd_chat(&tracker).await
        }
        Commands::Sync { action } => {
            let tracker = commands::open_tracker(&db_path, &config, user)?;
            match action {
                SyncAction::Push => commands::cmd_sync_push(&tracker, &config).await,
                SyncAction::Export { file } => commands::cmd_sync_export(&tracker, &file).await,
                SyncAction::Test => commands::cmd_sync_test(&config).await,
            }
        }
        Commands::Llm { action } => match action {
            LlmAction::Test { text } => commands::cmd_llm_test(&config, &text).await,
        },
        Commands::Prompts { action } => match action {
            PromptsAction::List => commands::cmd_prompts_list(),
            PromptsAction::Show { prompt_id } => commands::cmd_prompts_show(&prompt_id),
            PromptsAction::Path => commands::cmd_prompts_path(),
        },
    }
}
