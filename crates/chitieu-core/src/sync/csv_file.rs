//! Local CSV destination
//!
//! Transactions append to the configured file; balance snapshots go to a
//! sibling file named `<stem>_balance.csv`. A header row is written when a
//! file is created (or found empty).

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use super::{now, BalanceRow, SyncDestination, TransactionRow};
use crate::error::Result;
use crate::models::{Balance, Transaction};

#[derive(Debug, Clone)]
pub struct CsvDestination {
    path: PathBuf,
}

impl CsvDestination {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File receiving balance snapshots
    pub fn balance_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "chitieu".to_string());
        self.path.with_file_name(format!("{}_balance.csv", stem))
    }
}

/// Append serializable rows to `path`, writing a header if the file is new
fn append_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(rows.len())
}

#[async_trait]
impl SyncDestination for CsvDestination {
    fn name(&self) -> &str {
        "csv"
    }

    async fn push_transactions(&self, transactions: &[Transaction]) -> Result<usize> {
        let synced_at = now();
        let rows: Vec<TransactionRow> = transactions
            .iter()
            .map(|tx| TransactionRow::new(tx, synced_at))
            .collect();
        append_rows(&self.path, &rows)
    }

    async fn push_balance(&self, balance: &Balance) -> Result<()> {
        append_rows(&self.balance_path(), &[BalanceRow::new(balance, now())])?;
        Ok(())
    }

    async fn test_connection(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&self.path)?;
        Ok(())
    }
}
