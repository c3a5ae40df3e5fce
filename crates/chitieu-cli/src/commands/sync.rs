//! Sync command implementations

use std::path::Path;

use anyhow::{bail, Context, Result};
use chitieu_core::models::format_vnd;
use chitieu_core::sync::export_csv;
use chitieu_core::{Config, ExpenseTracker, SyncService};

fn configured_service(config: &Config) -> Result<SyncService> {
    match SyncService::from_config(&config.sync).context("Invalid sync configuration")? {
        Some(service) => Ok(service),
        None => bail!("Sync is disabled. Set [sync] enabled = true in the config file."),
    }
}

/// Push unsynced transactions and a balance snapshot
pub async fn cmd_sync_push(tracker: &ExpenseTracker, config: &Config) -> Result<()> {
    let service = configured_service(config)?;
    println!("📤 Syncing to {}...", service.name());

    let report = service
        .push_pending(tracker.db(), tracker.user_id())
        .await
        .context("Failed to push transactions")?;
    if report.pushed == 0 {
        println!("   No new transactions");
    } else {
        println!("   Pushed {} transactions", report.pushed);
    }

    let balance = service
        .push_balance(tracker.db(), tracker.user_id())
        .await
        .context("Failed to push balance")?;
    println!(
        "   Balance: cash {}, account {}",
        format_vnd(balance.cash),
        format_vnd(balance.bank_account)
    );

    println!("✅ Sync complete");
    Ok(())
}

/// Write every transaction to a CSV file
pub async fn cmd_sync_export(tracker: &ExpenseTracker, file: &Path) -> Result<()> {
    let count = export_csv(tracker.db(), tracker.user_id(), file)
        .await
        .with_context(|| format!("Failed to export to {}", file.display()))?;
    println!("✅ Exported {} transactions to {}", count, file.display());
    Ok(())
}

pub async fn cmd_sync_test(config: &Config) -> Result<()> {
    let service = configured_service(config)?;
    print!("Checking {} destination... ", service.name());
    match service.test_connection().await {
        Ok(()) => println!("✅ Connected"),
        Err(e) => {
            println!("❌ Failed");
            println!("   {}", e);
        }
    }
    Ok(())
}
