//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `load_config` / `resolve_db_path` - Resolve settings from flags and config
//! - `open_db` / `open_tracker` - Shared utilities to open the ledger
//! - `cmd_init` - Initialize the database

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chitieu_core::config::default_db_path;
use chitieu_core::{BackendKind, Config, Database, ExpenseTracker, Interpreter, SyncService};
use tracing::warn;

/// Load configuration; `offline` disables the language model
pub fn load_config(path: Option<&Path>, offline: bool) -> Result<Config> {
    let mut config = Config::load(path).context("Failed to load config")?;
    if offline {
        config.llm.backend = BackendKind::None;
    }
    Ok(config)
}

/// Database path from `--db`, else the platform data directory
pub fn resolve_db_path(flag: Option<&Path>) -> PathBuf {
    flag.map(Path::to_path_buf).unwrap_or_else(default_db_path)
}

/// Open the database, creating its directory if needed
pub fn open_db(db_path: &Path) -> Result<Database> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

/// Build a ledger for `user` (or the configured user)
///
/// A broken sync setup is reported and skipped; logging expenses still works.
pub fn tracker_for(db: Database, config: &Config, user: Option<&str>) -> Result<ExpenseTracker> {
    let user = user.unwrap_or(&config.user.name);
    let interpreter = Interpreter::from_config(&config.llm);

    let sync = match SyncService::from_config(&config.sync) {
        Ok(sync) => sync,
        Err(e) => {
            warn!("Sync disabled: {}", e);
            None
        }
    };

    let tracker = ExpenseTracker::new(db, interpreter, user)
        .with_context(|| format!("Failed to load user '{}'", user))?;
    Ok(tracker.with_sync(sync))
}

pub fn open_tracker(db_path: &Path, config: &Config, user: Option<&str>) -> Result<ExpenseTracker> {
    let db = open_db(db_path)?;
    tracker_for(db, config, user)
}

pub fn cmd_init(db_path: &Path, config: &Config) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;
    let users = db.list_users().context("Failed to list users")?;
    println!("   Users: {}", users.join(", "));

    match &config.source {
        Some(path) => println!("   Config: {}", path.display()),
        None => println!("   Config: built-in defaults"),
    }
    println!(
        "   Language model: {} ({})",
        config.llm.backend.as_str(),
        config.llm.model
    );
    if config.sync.enabled {
        println!("   Sync: {}", config.sync.destination.as_str());
    } else {
        println!("   Sync: disabled");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Set balances: chitieu balance tiền mặt 500k, tài khoản 2 triệu");
    println!("  2. Log an expense: chitieu say trưa ăn phở 35k");
    println!("  3. Start chatting: chitieu chat");

    Ok(())
}
