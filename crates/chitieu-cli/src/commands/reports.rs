//! Report command implementations (stats, recent)

use anyhow::{anyhow, Context, Result};
use chitieu_core::models::{format_vnd, DailyTotal, StatsPeriod};
use chitieu_core::ExpenseTracker;

use super::entries::render_outcome;

/// Width of the longest bar in per-day charts
const BAR_WIDTH: i64 = 30;

pub fn cmd_stats(
    tracker: &ExpenseTracker,
    period: &str,
    by_day: bool,
    weeks: Option<u32>,
) -> Result<()> {
    let period: StatsPeriod = period.parse().map_err(|e: String| anyhow!(e))?;
    let ctx = tracker.context();

    let outcome = tracker
        .statistics(period, &ctx)
        .context("Failed to compute statistics")?;
    println!("{}", render_outcome(&outcome));

    let db = tracker.db();
    if by_day {
        let days = match period {
            StatsPeriod::Month => db.month_daily_totals(tracker.user_id(), ctx.today),
            _ => {
                let (from, to) = period.range(ctx.today);
                db.daily_totals(tracker.user_id(), from, to)
            }
        }
        .context("Failed to compute daily totals")?;

        println!();
        println!("📅 Theo ngày:");
        for line in daily_chart(&days) {
            println!("   {}", line);
        }
    }

    if let Some(weeks) = weeks {
        let totals = db
            .weekly_totals(tracker.user_id(), ctx.today, weeks)
            .context("Failed to compute weekly totals")?;
        println!();
        println!("🗓️ Theo tuần:");
        for week in totals {
            println!(
                "   {} - {}  {:>3} khoản  {:>14}",
                week.from.format("%d/%m"),
                week.to.format("%d/%m"),
                week.count,
                format_vnd(week.total)
            );
        }
    }

    Ok(())
}

/// One line per day with a bar scaled to the largest day
pub fn daily_chart(days: &[DailyTotal]) -> Vec<String> {
    let max = days.iter().map(|d| d.total).max().unwrap_or(0);
    days.iter()
        .map(|day| {
            let width = if max > 0 { day.total * BAR_WIDTH / max } else { 0 };
            format!(
                "{}  {:>12}  {}",
                day.date.format("%d/%m"),
                format_vnd(day.total),
                "█".repeat(usize::try_from(width).unwrap_or(0))
            )
        })
        .collect()
}

pub fn cmd_recent(tracker: &ExpenseTracker, limit: i64) -> Result<()> {
    let transactions = tracker
        .db()
        .recent_transactions(tracker.user_id(), limit)
        .context("Failed to list transactions")?;

    if transactions.is_empty() {
        println!("Chưa có giao dịch nào.");
        return Ok(());
    }

    println!(
        "{:>5}  {:<10} {:<5} {:<8} {:<25} {:>12}  {:<10} {:<6} {}",
        "ID", "NGÀY", "GIỜ", "BỮA", "MÓN", "SỐ TIỀN", "NGUỒN", "PHÂN TÍCH", "SYNC"
    );
    println!("{}", "-".repeat(100));

    for tx in transactions {
        let amount = tx.kind.sign() * tx.price;
        println!(
            "{:>5}  {:<10} {:<5} {:<8} {:<25} {:>12}  {:<10} {:<6} {}",
            tx.id,
            tx.date,
            tx.time.map(|t| t.format("%H:%M").to_string()).unwrap_or_default(),
            tx.meal_time.label_vi(),
            truncate(&tx.food_item, 25),
            format_vnd(amount),
            tx.account.label_vi(),
            tx.source.as_str(),
            if tx.synced_at.is_some() { "✓" } else { "" }
        );
    }

    Ok(())
}

/// Truncate to `max` characters, marking the cut with "…"
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
