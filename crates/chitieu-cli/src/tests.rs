//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Cursor;

use chitieu_core::models::{DailyTotal, ParseFailure};
use chitieu_core::{Config, Database, ExpenseTracker, Intent, Interpreter, Outcome, DEFAULT_USER};
use chrono::NaiveDate;

use crate::commands::{self, truncate};

fn setup_tracker() -> ExpenseTracker {
    let db = Database::in_memory().unwrap();
    ExpenseTracker::new(db, Interpreter::rules_only(), DEFAULT_USER).unwrap()
}

fn offline_config() -> Config {
    let mut config = Config::embedded().unwrap();
    config.llm.backend = chitieu_core::BackendKind::None;
    config
}

// ========== Config / Setup Tests ==========

#[test]
fn test_load_config_offline_disables_llm() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chitieu.toml");
    std::fs::write(&path, "[llm]\nbackend = \"ollama\"\n").unwrap();

    let config = commands::load_config(Some(&path), true).unwrap();
    assert_eq!(config.llm.backend, chitieu_core::BackendKind::None);
    assert_eq!(config.source.as_deref(), Some(path.as_path()));
}

#[test]
fn test_load_config_missing_file_errors() {
    let dir = tempfile::tempdir().unwrap();
    let result = commands::load_config(Some(&dir.path().join("missing.toml")), false);
    assert!(result.is_err());
}

#[test]
fn test_resolve_db_path_prefers_flag() {
    let flag = std::path::Path::new("/tmp/custom.db");
    assert_eq!(commands::resolve_db_path(Some(flag)), flag.to_path_buf());
    assert!(commands::resolve_db_path(None).ends_with("chitieu.db"));
}

#[test]
fn test_open_tracker_creates_directory_and_user() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("data").join("chitieu.db");

    let tracker = commands::open_tracker(&db_path, &offline_config(), Some("lan")).unwrap();
    assert_eq!(tracker.user(), "lan");
    assert!(db_path.exists());
    assert!(tracker.interpreter().llm().is_none());
}

#[test]
fn test_tracker_for_skips_broken_sync() {
    let mut config = offline_config();
    config.sync.enabled = true;
    config.sync.destination = chitieu_core::SyncTarget::Sheets;
    config.sync.spreadsheet_id = None;

    let tracker = commands::tracker_for(Database::in_memory().unwrap(), &config, None).unwrap();
    assert!(tracker.sync().is_none());
}

#[test]
fn test_cmd_init() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("chitieu.db");
    assert!(commands::cmd_init(&db_path, &offline_config()).is_ok());
    assert!(db_path.exists());
}

// ========== Entry Command Tests ==========

#[tokio::test]
async fn test_cmd_say_records_expense() {
    let tracker = setup_tracker();
    commands::cmd_say(&tracker, "trưa ăn phở 35k").await.unwrap();

    let recent = tracker.db().recent_transactions(tracker.user_id(), 1).unwrap();
    assert_eq!(recent[0].food_item, "phở");
}

#[tokio::test]
async fn test_cmd_forced_balance_and_delete() {
    let tracker = setup_tracker();
    commands::cmd_forced(&tracker, Intent::UpdateBalance, "tiền mặt 200k")
        .await
        .unwrap();
    commands::cmd_forced(&tracker, Intent::AddExpense, "bún chả 40k")
        .await
        .unwrap();
    assert_eq!(tracker.balance().unwrap().cash, 160_000);

    commands::cmd_forced(&tracker, Intent::Delete, "").await.unwrap();
    assert_eq!(tracker.balance().unwrap().cash, 200_000);
    assert!(commands::cmd_balance_show(&tracker).is_ok());
}

#[test]
fn test_render_not_understood_has_hint() {
    let text = commands::render_outcome(&Outcome::NotUnderstood {
        failure: ParseFailure::NoPriceFound,
    });
    assert!(text.starts_with("❓"));
    assert!(text.contains(ParseFailure::NoPriceFound.hint_vi()));
}

#[tokio::test]
async fn test_render_recorded_expense() {
    let tracker = setup_tracker();
    let processed = tracker.process("sáng ăn bánh mì 20k").await.unwrap();
    let text = commands::render_processed(&processed);
    assert!(text.contains("Đã ghi chi tiêu: bánh mì - 20.000đ"));
    assert!(text.contains("tiền mặt, sáng"));
    assert!(text.contains("quy tắc"));
}

// ========== Chat Tests ==========

#[tokio::test]
async fn test_run_chat_until_exit() {
    let tracker = setup_tracker();
    let input = Cursor::new("trưa ăn phở 35k\n\nxin chào\nthoát\nuống cafe 25k\n");
    let mut output = Vec::new();

    let handled = commands::run_chat(&tracker, input, &mut output).await.unwrap();
    assert_eq!(handled, 2);

    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("phở - 35.000đ"));
    assert!(text.contains("❓"));
    assert!(text.trim_end().ends_with("👋 Tạm biệt!"));
    assert_eq!(tracker.db().count_transactions(tracker.user_id()).unwrap(), 1);
}

#[tokio::test]
async fn test_run_chat_eof() {
    let tracker = setup_tracker();
    let mut output = Vec::new();
    let handled = commands::run_chat(&tracker, Cursor::new(""), &mut output)
        .await
        .unwrap();
    assert_eq!(handled, 0);
}

// ========== Report Tests ==========

#[tokio::test]
async fn test_cmd_stats_periods() {
    let tracker = setup_tracker();
    tracker.process("trưa ăn phở 35k").await.unwrap();

    assert!(commands::cmd_stats(&tracker, "today", false, None).is_ok());
    assert!(commands::cmd_stats(&tracker, "week", true, Some(4)).is_ok());
    assert!(commands::cmd_stats(&tracker, "month", true, None).is_ok());
    assert!(commands::cmd_stats(&tracker, "days:10", true, None).is_ok());
    assert!(commands::cmd_stats(&tracker, "fortnight", false, None).is_err());
}

#[test]
fn test_cmd_recent() {
    let tracker = setup_tracker();
    assert!(commands::cmd_recent(&tracker, 10).is_ok());
}

#[test]
fn test_daily_chart_scales_to_max() {
    let date = |d| NaiveDate::from_ymd_opt(2024, 10, d).unwrap();
    let days = vec![
        DailyTotal {
            date: date(1),
            count: 1,
            total: 100_000,
        },
        DailyTotal {
            date: date(2),
            count: 0,
            total: 0,
        },
        DailyTotal {
            date: date(3),
            count: 1,
            total: 50_000,
        },
    ];
    let lines = commands::daily_chart(&days);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].matches('█').count(), 30);
    assert_eq!(lines[1].matches('█').count(), 0);
    assert_eq!(lines[2].matches('█').count(), 15);
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("phở", 10), "phở");
    assert_eq!(truncate("bánh mì thịt nướng", 8), "bánh mì…");
}

// ========== Sync Tests ==========

#[tokio::test]
async fn test_cmd_sync_export() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("export.csv");
    let tracker = setup_tracker();
    tracker.process("trưa ăn phở 35k").await.unwrap();

    commands::cmd_sync_export(&tracker, &file).await.unwrap();
    let content = std::fs::read_to_string(&file).unwrap();
    assert_eq!(content.lines().count(), 2);
}

#[tokio::test]
async fn test_cmd_sync_push_requires_enabled() {
    let tracker = setup_tracker();
    let result = commands::cmd_sync_push(&tracker, &offline_config()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cmd_sync_push_csv() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = offline_config();
    config.sync.enabled = true;
    config.sync.csv_path = Some(dir.path().join("sync.csv"));

    let tracker = setup_tracker();
    tracker.process("trưa ăn phở 35k").await.unwrap();

    commands::cmd_sync_push(&tracker, &config).await.unwrap();
    assert!(tracker
        .db()
        .unsynced_transactions(tracker.user_id())
        .unwrap()
        .is_empty());
    assert!(commands::cmd_sync_test(&config).await.is_ok());
}

// ========== LLM / Prompt Tests ==========

#[tokio::test]
async fn test_cmd_llm_test_offline() {
    assert!(commands::cmd_llm_test(&offline_config(), "ăn phở 35k").await.is_ok());
}

#[test]
fn test_cmd_prompts() {
    assert!(commands::cmd_prompts_list().is_ok());
    assert!(commands::cmd_prompts_show("interpret_utterance").is_ok());
    assert!(commands::cmd_prompts_show("nope").is_ok());
    assert!(commands::cmd_prompts_path().is_ok());
}
