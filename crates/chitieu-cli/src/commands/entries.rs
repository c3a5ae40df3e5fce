//! Chat-message command implementations (say, add, delete, balance)
//!
//! Outcomes are rendered to strings so the interactive chat and the one-shot
//! commands print the same thing.

use anyhow::{Context, Result};
use chitieu_core::models::{
    format_vnd, BalanceAccount, BalanceOperation, InterpretationSource, TransactionKind,
};
use chitieu_core::{ExpenseTracker, Intent, Outcome, Processed};

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Interpret a free-form message and apply it
pub async fn cmd_say(tracker: &ExpenseTracker, text: &str) -> Result<()> {
    let processed = tracker
        .process(text)
        .await
        .context("Failed to process message")?;
    println!("{}", render_processed(&processed));
    Ok(())
}

/// Apply a message whose intent comes from the command name
pub async fn cmd_forced(tracker: &ExpenseTracker, intent: Intent, text: &str) -> Result<()> {
    let ctx = tracker.context();
    let processed = tracker
        .process_as(intent, text, &ctx)
        .await
        .context("Failed to process message")?;
    println!("{}", render_processed(&processed));
    Ok(())
}

pub fn cmd_balance_show(tracker: &ExpenseTracker) -> Result<()> {
    let balance = tracker.balance().context("Failed to read balance")?;
    println!("💰 Số dư của {}:", tracker.user());
    println!("   Tiền mặt:  {:>15}", format_vnd(balance.cash));
    println!("   Tài khoản: {:>15}", format_vnd(balance.bank_account));
    println!("   Tổng:      {:>15}", format_vnd(balance.total()));
    Ok(())
}

/// Render an outcome as the chat reply
pub fn render_processed(processed: &Processed) -> String {
    let mut out = render_outcome(&processed.outcome);
    if processed.source != InterpretationSource::Manual
        && !matches!(processed.outcome, Outcome::NotUnderstood { .. })
    {
        out.push_str(&format!(
            "\n   {}(phân tích: {}){}",
            DIM,
            source_label(processed.source),
            RESET
        ));
    }
    out
}

fn source_label(source: InterpretationSource) -> &'static str {
    match source {
        InterpretationSource::Llm => "mô hình ngôn ngữ",
        InterpretationSource::Rules => "quy tắc",
        InterpretationSource::Manual => "lệnh",
    }
}

pub fn render_outcome(outcome: &Outcome) -> String {
    let mut lines = Vec::new();

    match outcome {
        Outcome::Recorded {
            transaction,
            balance,
            today,
            week,
        } => {
            let (icon, action) = match transaction.kind {
                TransactionKind::Expense => ("💸", "Đã ghi chi tiêu"),
                TransactionKind::Income => ("💰", "Đã ghi thu nhập"),
            };
            lines.push(format!(
                "{} {}: {} - {} ({}, {})",
                icon,
                action,
                transaction.food_item,
                format_vnd(transaction.price),
                transaction.account.label_vi(),
                transaction.meal_time.label_vi()
            ));
            lines.push(format!(
                "   Số dư {}: {}",
                transaction.account.label_vi(),
                format_vnd(balance.get(transaction.account))
            ));
            lines.push(format!(
                "   Hôm nay: {} khoản, {} | 7 ngày: {} khoản, {}",
                today.count,
                format_vnd(today.total_expense),
                week.count,
                format_vnd(week.total_expense)
            ));
        }
        Outcome::BalanceUpdated { update, after, .. } => {
            let changes: Vec<String> = update
                .amounts()
                .iter()
                .map(|(account, amount)| {
                    let name = match account {
                        BalanceAccount::Cash => "Tiền mặt",
                        BalanceAccount::BankAccount => "Tài khoản",
                    };
                    let amount = format_vnd(i64::try_from(*amount).unwrap_or(i64::MAX));
                    match update.operation() {
                        BalanceOperation::Set => format!("{} = {}", name, amount),
                        BalanceOperation::Add => format!("{} +{}", name, amount),
                    }
                })
                .collect();
            lines.push(format!("💰 Đã cập nhật số dư: {}", changes.join(", ")));
            lines.push(format!(
                "   Hiện tại: tiền mặt {}, tài khoản {}, tổng {}",
                format_vnd(after.cash),
                format_vnd(after.bank_account),
                format_vnd(after.total())
            ));
        }
        Outcome::Deleted {
            transaction,
            balance,
        } => {
            lines.push(format!(
                "🗑️ Đã xóa: {} - {} ({})",
                transaction.food_item,
                format_vnd(transaction.price),
                transaction.date.format("%d/%m")
            ));
            lines.push(format!(
                "   Số dư {}: {}",
                transaction.account.label_vi(),
                format_vnd(balance.get(transaction.account))
            ));
        }
        Outcome::NothingToDelete { intent } => {
            let what = intent
                .query
                .clone()
                .unwrap_or_else(|| "giao dịch nào".to_string());
            lines.push(format!("❌ Không tìm thấy {} để xóa", what));
        }
        Outcome::Statistics {
            period,
            summary,
            recent,
        } => {
            lines.push(format!("📊 Thống kê chi tiêu {}", period.label_vi()));
            lines.push(format!("   Số giao dịch: {}", summary.count));
            lines.push(format!("   Tổng chi:     {}", format_vnd(summary.total_expense)));
            if summary.count > 0 {
                lines.push(format!(
                    "   Trung bình:   {}",
                    format_vnd(summary.average.round() as i64)
                ));
                lines.push(format!("   Thấp nhất:    {}", format_vnd(summary.min)));
                lines.push(format!("   Cao nhất:     {}", format_vnd(summary.max)));
            }
            if summary.total_income > 0 {
                lines.push(format!("   Thu nhập:     {}", format_vnd(summary.total_income)));
            }
            if !recent.is_empty() {
                lines.push("   Gần đây:".to_string());
                for tx in recent {
                    lines.push(format!(
                        "   - {} {} - {}",
                        tx.date.format("%d/%m"),
                        tx.food_item,
                        format_vnd(tx.price)
                    ));
                }
            }
        }
        Outcome::NotUnderstood { failure } => {
            lines.push(format!("❓ Chưa hiểu: {}", failure));
            lines.push(format!("💡 {}", failure.hint_vi()));
        }
    }

    lines.join("\n")
}
