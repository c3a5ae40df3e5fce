//! Users and balances

use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{Balance, BalanceAccount};

/// Column holding the balance of `account`
pub(crate) fn balance_column(account: BalanceAccount) -> &'static str {
    match account {
        BalanceAccount::Cash => "cash_balance",
        BalanceAccount::BankAccount => "account_balance",
    }
}

impl Database {
    /// Get the id for a user name, creating the user if needed
    pub fn user_id_for(&self, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("User name must not be empty".into()));
        }

        let conn = self.conn()?;
        conn.execute("INSERT OR IGNORE INTO users (name) VALUES (?)", params![name])?;
        let id = conn.query_row(
            "SELECT id FROM users WHERE name = ?",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// List user names, oldest first
    pub fn list_users(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM users ORDER BY id")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Current balances for a user
    pub fn balance(&self, user_id: i64) -> Result<Balance> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT cash_balance, account_balance FROM users WHERE id = ?",
            params![user_id],
            |row| {
                Ok(Balance {
                    cash: row.get(0)?,
                    bank_account: row.get(1)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("User {}", user_id)))
    }

    /// Replace one balance, returning the new balances
    pub fn set_balance(
        &self,
        user_id: i64,
        account: BalanceAccount,
        amount: i64,
    ) -> Result<Balance> {
        let conn = self.conn()?;
        let sql = format!(
            "UPDATE users SET {} = ?, updated_at = datetime('now') WHERE id = ?",
            balance_column(account)
        );
        let updated = conn.execute(&sql, params![amount, user_id])?;
        if updated == 0 {
            return Err(Error::NotFound(format!("User {}", user_id)));
        }
        self.balance(user_id)
    }

    /// Add a signed delta to one balance, returning the new balances
    pub fn adjust_balance(
        &self,
        user_id: i64,
        account: BalanceAccount,
        delta: i64,
    ) -> Result<Balance> {
        let conn = self.conn()?;
        let sql = format!(
            "UPDATE users SET {col} = {col} + ?, updated_at = datetime('now') WHERE id = ?",
            col = balance_column(account)
        );
        let updated = conn.execute(&sql, params![delta, user_id])?;
        if updated == 0 {
            return Err(Error::NotFound(format!("User {}", user_id)));
        }
        self.balance(user_id)
    }
}
