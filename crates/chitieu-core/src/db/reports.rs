//! Spending reports
//!
//! Only expenses count toward spending totals; income is reported separately
//! in [`SpendingSummary::total_income`].

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use rusqlite::params;

use super::{parse_date, Database};
use crate::error::Result;
use crate::models::{DailyTotal, PeriodTotal, SpendingSummary};

impl Database {
    /// Aggregate spending for a user over an inclusive date range
    pub fn spending_summary(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<SpendingSummary> {
        let conn = self.conn()?;

        let (count, total_expense, min, max): (i64, i64, i64, i64) = conn.query_row(
            r#"
            SELECT COUNT(*), COALESCE(SUM(price), 0), COALESCE(MIN(price), 0), COALESCE(MAX(price), 0)
            FROM transactions
            WHERE user_id = ?1 AND transaction_type = 'expense'
              AND transaction_date BETWEEN ?2 AND ?3
            "#,
            params![user_id, from.to_string(), to.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let total_income: i64 = conn.query_row(
            r#"
            SELECT COALESCE(SUM(price), 0)
            FROM transactions
            WHERE user_id = ?1 AND transaction_type = 'income'
              AND transaction_date BETWEEN ?2 AND ?3
            "#,
            params![user_id, from.to_string(), to.to_string()],
            |row| row.get(0),
        )?;

        let average = if count > 0 {
            total_expense as f64 / count as f64
        } else {
            0.0
        };

        Ok(SpendingSummary {
            from,
            to,
            count,
            total_expense,
            total_income,
            average,
            min,
            max,
        })
    }

    /// Expense totals per day, one entry for every day in the range
    pub fn daily_totals(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyTotal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT transaction_date, COUNT(*), SUM(price)
            FROM transactions
            WHERE user_id = ?1 AND transaction_type = 'expense'
              AND transaction_date BETWEEN ?2 AND ?3
            GROUP BY transaction_date
            "#,
        )?;

        let by_date: HashMap<NaiveDate, (i64, i64)> = stmt
            .query_map(params![user_id, from.to_string(), to.to_string()], |row| {
                let date: String = row.get(0)?;
                Ok((parse_date(&date), (row.get(1)?, row.get(2)?)))
            })?
            .collect::<std::result::Result<_, _>>()?;

        Ok(from
            .iter_days()
            .take_while(|d| *d <= to)
            .map(|date| {
                let (count, total) = by_date.get(&date).copied().unwrap_or((0, 0));
                DailyTotal { date, count, total }
            })
            .collect())
    }

    /// Expense totals for `weeks` consecutive 7-day buckets ending at `end`, oldest first
    pub fn weekly_totals(
        &self,
        user_id: i64,
        end: NaiveDate,
        weeks: u32,
    ) -> Result<Vec<PeriodTotal>> {
        if weeks == 0 {
            return Ok(Vec::new());
        }
        let start = end - Duration::days(i64::from(weeks) * 7 - 1);
        let days = self.daily_totals(user_id, start, end)?;

        Ok(days
            .chunks(7)
            .filter_map(|chunk| {
                let first = chunk.first()?;
                let last = chunk.last()?;
                Some(PeriodTotal {
                    from: first.date,
                    to: last.date,
                    count: chunk.iter().map(|d| d.count).sum(),
                    total: chunk.iter().map(|d| d.total).sum(),
                })
            })
            .collect())
    }

    /// Expense totals for each day of the current month, from the 1st through `today`
    pub fn month_daily_totals(&self, user_id: i64, today: NaiveDate) -> Result<Vec<DailyTotal>> {
        let first = today.with_day(1).unwrap_or(today);
        self.daily_totals(user_id, first, today)
    }
}
