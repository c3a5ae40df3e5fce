//! Transaction operations

use rusqlite::{params, OptionalExtension};

use super::users::balance_column;
use super::{parse_date, parse_datetime, parse_time, Database};
use crate::error::{Error, Result};
use crate::models::{InterpretationSource, ParsedExpense, Transaction, TransactionQuery};

const TRANSACTION_COLUMNS: &str = "id, user_id, food_item, price, meal_time, transaction_type, \
     account_type, transaction_date, transaction_time, source, synced_at, created_at";

/// Escape LIKE wildcards so user text matches literally
fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for ch in text.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

impl Database {
    /// Store an expense or income and apply it to the user's balance
    ///
    /// Both writes happen in one SQLite transaction.
    pub fn insert_transaction(
        &self,
        user_id: i64,
        expense: &ParsedExpense,
        source: InterpretationSource,
    ) -> Result<Transaction> {
        let price = i64::try_from(expense.price.get())
            .map_err(|_| Error::InvalidData(format!("Price too large: {}", expense.price)))?;
        let delta = expense.kind.sign() * price;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO transactions (user_id, food_item, price, meal_time, transaction_type,
                                      account_type, transaction_date, transaction_time, source)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                expense.food_item,
                price,
                expense.meal_time.as_str(),
                expense.kind.as_str(),
                expense.account.as_str(),
                expense.date.to_string(),
                expense.time.map(|t| t.format("%H:%M:%S").to_string()),
                source.as_str(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        let sql = format!(
            "UPDATE users SET {col} = {col} + ?, updated_at = datetime('now') WHERE id = ?",
            col = balance_column(expense.account)
        );
        if tx.execute(&sql, params![delta, user_id])? == 0 {
            return Err(Error::NotFound(format!("User {}", user_id)));
        }

        tx.commit()?;

        self.get_transaction(id)?
            .ok_or_else(|| Error::NotFound(format!("Transaction {}", id)))
    }

    /// Get a single transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM transactions WHERE id = ?", TRANSACTION_COLUMNS);
        let transaction = conn
            .query_row(&sql, params![id], Self::row_to_transaction)
            .optional()?;
        Ok(transaction)
    }

    /// Most recently recorded transactions for a user, newest first
    pub fn recent_transactions(&self, user_id: i64, limit: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM transactions WHERE user_id = ? ORDER BY id DESC LIMIT ?",
            TRANSACTION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(params![user_id, limit], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    /// Transactions matching a query, newest first
    ///
    /// The text filter is a case-insensitive substring match on the item.
    pub fn find_transactions(
        &self,
        user_id: i64,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let mut sql = format!(
            "SELECT {} FROM transactions WHERE user_id = ?",
            TRANSACTION_COLUMNS
        );
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

        if let Some(text) = query.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            sql.push_str(" AND lower(food_item) LIKE ? ESCAPE '\\'");
            values.push(Box::new(like_pattern(text)));
        }
        if let Some(price) = query.price {
            sql.push_str(" AND price = ?");
            values.push(Box::new(price));
        }
        if let Some(meal_time) = query.meal_time {
            sql.push_str(" AND meal_time = ?");
            values.push(Box::new(meal_time.as_str()));
        }
        sql.push_str(" ORDER BY id DESC");

        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(refs.as_slice(), Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    /// Delete a transaction and undo its effect on the balance
    ///
    /// Returns the removed transaction, or `None` if it did not exist.
    pub fn delete_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let Some(transaction) = self.get_transaction(id)? else {
            return Ok(None);
        };

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let deleted = tx.execute("DELETE FROM transactions WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Ok(None);
        }

        let sql = format!(
            "UPDATE users SET {col} = {col} - ?, updated_at = datetime('now') WHERE id = ?",
            col = balance_column(transaction.account)
        );
        tx.execute(&sql, params![transaction.balance_delta(), transaction.user_id])?;

        tx.commit()?;
        Ok(Some(transaction))
    }

    /// Transactions not yet pushed to the sync destination, oldest first
    pub fn unsynced_transactions(&self, user_id: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM transactions WHERE user_id = ? AND synced_at IS NULL ORDER BY id",
            TRANSACTION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(params![user_id], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    /// Stamp transactions as synced; returns how many rows changed
    pub fn mark_synced(&self, ids: &[i64]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut updated = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE transactions SET synced_at = datetime('now') WHERE id = ? AND synced_at IS NULL",
            )?;
            for id in ids {
                updated += stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
        Ok(updated)
    }

    /// Count all transactions for a user
    pub fn count_transactions(&self, user_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Column order: see `TRANSACTION_COLUMNS`
    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let meal_time: String = row.get(4)?;
        let kind: String = row.get(5)?;
        let account: String = row.get(6)?;
        let date: String = row.get(7)?;
        let time: Option<String> = row.get(8)?;
        let source: String = row.get(9)?;
        let synced_at: Option<String> = row.get(10)?;
        let created_at: String = row.get(11)?;
        Ok(Transaction {
            id: row.get(0)?,
            user_id: row.get(1)?,
            food_item: row.get(2)?,
            price: row.get(3)?,
            meal_time: meal_time.parse().unwrap_or_default(),
            kind: kind.parse().unwrap_or_default(),
            account: account.parse().unwrap_or_default(),
            date: parse_date(&date),
            time: time.as_deref().and_then(parse_time),
            source: source.parse().unwrap_or_default(),
            synced_at: synced_at.as_deref().map(parse_datetime),
            created_at: parse_datetime(&created_at),
        })
    }
}
