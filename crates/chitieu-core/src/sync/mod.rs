//! Spreadsheet sync
//!
//! Pushes transactions and balance snapshots to an external sheet. Two
//! destinations are available: a local CSV file and Google Sheets.
//!
//! Sync is an add-on; the ledger treats every sync error as non-fatal.

mod csv_file;
mod sheets;

pub use self::csv_file::CsvDestination;
pub use self::sheets::SheetsDestination;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::info;

use crate::config::{SyncConfig, SyncTarget};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Balance, Transaction};

/// Where synced rows go
#[async_trait]
pub trait SyncDestination: Send + Sync {
    /// Short name for logs and CLI output
    fn name(&self) -> &str;

    /// Append transactions; returns how many rows were written
    async fn push_transactions(&self, transactions: &[Transaction]) -> Result<usize>;

    /// Append a balance snapshot
    async fn push_balance(&self, balance: &Balance) -> Result<()>;

    /// Check the destination is reachable and writable
    async fn test_connection(&self) -> Result<()>;
}

/// One spreadsheet row per transaction
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRow {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Food Item")]
    pub food_item: String,
    #[serde(rename = "Price")]
    pub price: i64,
    #[serde(rename = "Meal Time")]
    pub meal_time: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Account")]
    pub account: String,
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Created At")]
    pub created_at: String,
    #[serde(rename = "Sync Date")]
    pub synced_at: String,
}

impl TransactionRow {
    pub fn new(tx: &Transaction, synced_at: NaiveDateTime) -> Self {
        Self {
            id: tx.id,
            date: tx.date.to_string(),
            time: tx
                .time
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_default(),
            food_item: tx.food_item.clone(),
            price: tx.price,
            meal_time: tx.meal_time.label_vi().to_string(),
            kind: tx.kind.as_str().to_string(),
            account: tx.account.as_str().to_string(),
            source: tx.source.as_str().to_string(),
            created_at: tx.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            synced_at: synced_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Cell values in column order, for APIs that take raw rows
    pub fn cells(&self) -> Vec<serde_json::Value> {
        vec![
            self.id.into(),
            self.date.clone().into(),
            self.time.clone().into(),
            self.food_item.clone().into(),
            self.price.into(),
            self.meal_time.clone().into(),
            self.kind.clone().into(),
            self.account.clone().into(),
            self.source.clone().into(),
            self.created_at.clone().into(),
            self.synced_at.clone().into(),
        ]
    }
}

/// One spreadsheet row per balance snapshot
#[derive(Debug, Clone, Serialize)]
pub struct BalanceRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Cash Balance")]
    pub cash: i64,
    #[serde(rename = "Account Balance")]
    pub bank_account: i64,
    #[serde(rename = "Total")]
    pub total: i64,
    #[serde(rename = "Notes")]
    pub notes: String,
}

impl BalanceRow {
    pub fn new(balance: &Balance, at: NaiveDateTime) -> Self {
        Self {
            date: at.date().to_string(),
            cash: balance.cash,
            bank_account: balance.bank_account,
            total: balance.total(),
            notes: format!("Auto sync at {}", at.format("%H:%M:%S")),
        }
    }

    pub fn cells(&self) -> Vec<serde_json::Value> {
        vec![
            self.date.clone().into(),
            self.cash.into(),
            self.bank_account.into(),
            self.total.into(),
            self.notes.clone().into(),
        ]
    }
}

pub(crate) fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Outcome of a push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Transactions written to the destination
    pub pushed: usize,
    /// Transactions stamped as synced in the database
    pub marked: usize,
}

/// Pushes database state to a destination
#[derive(Clone)]
pub struct SyncService {
    destination: Arc<dyn SyncDestination>,
}

impl SyncService {
    pub fn new(destination: impl SyncDestination + 'static) -> Self {
        Self {
            destination: Arc::new(destination),
        }
    }

    /// Build the configured destination, or `None` when sync is disabled
    pub fn from_config(config: &SyncConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }

        let service = match config.destination {
            SyncTarget::Csv => {
                let path = config
                    .csv_path
                    .clone()
                    .ok_or_else(|| Error::Config("sync.csv_path is required for csv sync".into()))?;
                Self::new(CsvDestination::new(path))
            }
            SyncTarget::Sheets => {
                let spreadsheet_id = config
                    .spreadsheet_id
                    .as_deref()
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| {
                        Error::Config("sync.spreadsheet_id is required for sheets sync".into())
                    })?;
                let token = std::env::var(&config.token_env).map_err(|_| {
                    Error::Config(format!(
                        "Sheets sync needs a bearer token in {}",
                        config.token_env
                    ))
                })?;
                Self::new(SheetsDestination::new(spreadsheet_id, &config.sheet, &token))
            }
        };

        Ok(Some(service))
    }

    pub fn name(&self) -> &str {
        self.destination.name()
    }

    /// Push every unsynced transaction of `user_id` and mark them synced
    pub async fn push_pending(&self, db: &Database, user_id: i64) -> Result<SyncReport> {
        let pending = db.unsynced_transactions(user_id)?;
        if pending.is_empty() {
            return Ok(SyncReport::default());
        }

        let pushed = self.destination.push_transactions(&pending).await?;
        let ids: Vec<i64> = pending.iter().map(|t| t.id).collect();
        let marked = db.mark_synced(&ids)?;

        info!(
            destination = self.name(),
            pushed, marked, "Synced transactions"
        );
        Ok(SyncReport { pushed, marked })
    }

    /// Append the current balances of `user_id`
    pub async fn push_balance(&self, db: &Database, user_id: i64) -> Result<Balance> {
        let balance = db.balance(user_id)?;
        self.destination.push_balance(&balance).await?;
        info!(destination = self.name(), "Synced balance");
        Ok(balance)
    }

    pub async fn test_connection(&self) -> Result<()> {
        self.destination.test_connection().await
    }
}

/// Write every transaction of `user_id` to a CSV file, oldest first
///
/// Replaces `path` if it exists. Does not touch sync state. Returns the
/// number of rows written.
pub async fn export_csv(db: &Database, user_id: i64, path: &Path) -> Result<usize> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let mut all = db.find_transactions(user_id, &Default::default())?;
    all.reverse();
    CsvDestination::new(path).push_transactions(&all).await
}
