//! Integration tests for chitieu-core
//!
//! These tests exercise the full utterance → interpretation → ledger workflow.

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use chitieu_core::{
    ai::{BalanceFields, ExpenseFields, LlmExtraction, LlmIntent},
    interpret::InterpretContext,
    models::{BalanceAccount, InterpretationSource, MealTime, ParseFailure, StatsPeriod},
    AIClient, CsvDestination, Database, ExpenseTracker, Interpreter, MockBackend, Outcome,
    SyncService, DEFAULT_USER,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, d).unwrap()
}

fn ctx(d: u32) -> InterpretContext {
    InterpretContext::new(day(d), DEFAULT_USER).at(NaiveTime::from_hms_opt(19, 0, 0).unwrap())
}

fn rules_tracker() -> ExpenseTracker {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    ExpenseTracker::new(db, Interpreter::rules_only(), DEFAULT_USER).unwrap()
}

// =============================================================================
// Rule-based workflow
// =============================================================================

#[tokio::test]
async fn test_day_of_chat_messages() {
    let tracker = rules_tracker();

    let messages = [
        "cập nhật tiền mặt 500k và tài khoản 5 triệu",
        "sáng ăn bánh mì 20k",
        "trưa ăn phở 35k",
        "chiều uống trà sữa 45k chuyển khoản",
        "tối ăn lẩu 300k",
    ];
    for message in messages {
        let processed = tracker.process_at(message, &ctx(20)).await.unwrap();
        assert!(
            !matches!(processed.outcome, Outcome::NotUnderstood { .. }),
            "not understood: {}",
            message
        );
    }

    let balance = tracker.balance().unwrap();
    assert_eq!(balance.cash, 500_000 - 20_000 - 35_000 - 300_000);
    assert_eq!(balance.bank_account, 5_000_000 - 45_000);

    let summary = tracker
        .db()
        .spending_summary(tracker.user_id(), day(20), day(20))
        .unwrap();
    assert_eq!(summary.count, 4);
    assert_eq!(summary.total_expense, 400_000);

    let meals: Vec<MealTime> = tracker
        .db()
        .recent_transactions(tracker.user_id(), 10)
        .unwrap()
        .into_iter()
        .map(|t| t.meal_time)
        .collect();
    assert_eq!(
        meals,
        vec![
            MealTime::Evening,
            MealTime::Afternoon,
            MealTime::Noon,
            MealTime::Morning
        ]
    );
}

#[tokio::test]
async fn test_yesterday_and_statistics() {
    let tracker = rules_tracker();
    tracker
        .process_at("hôm qua tối ăn bún chả 40k", &ctx(20))
        .await
        .unwrap();
    tracker.process_at("trưa ăn cơm 30k", &ctx(20)).await.unwrap();

    let processed = tracker.process_at("thống kê hôm nay", &ctx(20)).await.unwrap();
    let Outcome::Statistics { period, summary, .. } = processed.outcome else {
        panic!("expected statistics");
    };
    assert_eq!(period, StatsPeriod::Today);
    assert_eq!(summary.total_expense, 30_000);

    let processed = tracker.process_at("thống kê 7 ngày", &ctx(20)).await.unwrap();
    let Outcome::Statistics { period, summary, .. } = processed.outcome else {
        panic!("expected statistics");
    };
    assert_eq!(period, StatsPeriod::Days(7));
    assert_eq!(summary.total_expense, 70_000);
}

#[tokio::test]
async fn test_delete_then_balance_restored() {
    let tracker = rules_tracker();
    tracker.process_at("tiền mặt 200k", &ctx(20)).await.unwrap();
    tracker.process_at("ăn phở 35k", &ctx(20)).await.unwrap();
    assert_eq!(tracker.balance().unwrap().cash, 165_000);

    let processed = tracker
        .process_at("xóa giao dịch gần nhất", &ctx(20))
        .await
        .unwrap();
    assert!(matches!(processed.outcome, Outcome::Deleted { .. }));
    assert_eq!(tracker.balance().unwrap().cash, 200_000);
    assert_eq!(tracker.db().count_transactions(tracker.user_id()).unwrap(), 0);
}

#[tokio::test]
async fn test_unparseable_messages_change_nothing() {
    let tracker = rules_tracker();
    for message in ["", "xin chào", "ăn phở", "tiền mặt"] {
        let processed = tracker.process_at(message, &ctx(20)).await.unwrap();
        assert!(
            matches!(processed.outcome, Outcome::NotUnderstood { .. }),
            "should fail: {:?}",
            message
        );
    }
    assert_eq!(tracker.db().count_transactions(tracker.user_id()).unwrap(), 0);
    assert_eq!(tracker.balance().unwrap().total(), 0);
}

// =============================================================================
// Language-model stage
// =============================================================================

fn llm_tracker(extraction: LlmExtraction) -> ExpenseTracker {
    let db = Database::in_memory().unwrap();
    let client = AIClient::mock(MockBackend::with_response(extraction));
    let interpreter = Interpreter::with_llm(client, Duration::from_secs(2), 0.6);
    ExpenseTracker::new(db, interpreter, DEFAULT_USER).unwrap()
}

#[tokio::test]
async fn test_llm_expense_recorded() {
    let extraction = LlmExtraction {
        expense: Some(ExpenseFields {
            food_item: "Bún Bò Huế".to_string(),
            price: Some(50_000.0),
            meal_time: Some("morning".to_string()),
            ..ExpenseFields::default()
        }),
        ..LlmExtraction::bare(LlmIntent::AddExpense, 0.9)
    };
    let tracker = llm_tracker(extraction);

    let processed = tracker
        .process_at("sáng làm tô bún bò huế 50 nghìn", &ctx(20))
        .await
        .unwrap();
    assert_eq!(processed.source, InterpretationSource::Llm);
    let Outcome::Recorded { transaction, .. } = processed.outcome else {
        panic!("expected a recorded expense");
    };
    assert_eq!(transaction.food_item, "bún bò huế");
    assert_eq!(transaction.price, 50_000);
    assert_eq!(transaction.meal_time, MealTime::Morning);
    assert_eq!(transaction.date, day(20));
}

#[tokio::test]
async fn test_llm_balance_update() {
    let extraction = LlmExtraction {
        balance: Some(BalanceFields {
            operation: Some("set".to_string()),
            cash: Some(300_000.0),
            account: None,
        }),
        ..LlmExtraction::bare(LlmIntent::UpdateBalance, 0.85)
    };
    let tracker = llm_tracker(extraction);

    tracker
        .process_at("ví còn ba trăm nghìn", &ctx(20))
        .await
        .unwrap();
    assert_eq!(tracker.balance().unwrap().get(BalanceAccount::Cash), 300_000);
}

#[tokio::test]
async fn test_low_confidence_falls_back_to_rules() {
    let extraction = LlmExtraction {
        expense: Some(ExpenseFields {
            food_item: "không rõ".to_string(),
            price: Some(1.0),
            ..ExpenseFields::default()
        }),
        ..LlmExtraction::bare(LlmIntent::AddExpense, 0.2)
    };
    let tracker = llm_tracker(extraction);

    let processed = tracker.process_at("trưa ăn phở 35k", &ctx(20)).await.unwrap();
    assert_eq!(processed.source, InterpretationSource::Rules);
    let Outcome::Recorded { transaction, .. } = processed.outcome else {
        panic!("expected a recorded expense");
    };
    assert_eq!(transaction.food_item, "phở");
    assert_eq!(transaction.price, 35_000);
}

#[tokio::test]
async fn test_unreachable_model_falls_back_to_rules() {
    let db = Database::in_memory().unwrap();
    let interpreter = Interpreter::with_llm(
        AIClient::mock(MockBackend::unhealthy()),
        Duration::from_secs(1),
        0.6,
    );
    let tracker = ExpenseTracker::new(db, interpreter, DEFAULT_USER).unwrap();

    let processed = tracker.process_at("ăn phở", &ctx(20)).await.unwrap();
    assert_eq!(processed.source, InterpretationSource::Rules);
    assert!(matches!(
        processed.outcome,
        Outcome::NotUnderstood {
            failure: ParseFailure::NoPriceFound
        }
    ));
}

// =============================================================================
// Sync
// =============================================================================

#[tokio::test]
async fn test_csv_sync_across_messages() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chitieu_sync.csv");
    let tracker = rules_tracker().with_sync(Some(SyncService::new(CsvDestination::new(&path))));

    tracker.process_at("trưa ăn phở 35k", &ctx(20)).await.unwrap();
    tracker.process_at("tối ăn bún chả 40k", &ctx(20)).await.unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("ID,Date,Time,Food Item,Price"));
    assert!(lines[1].contains("phở"));
    assert!(lines[2].contains("bún chả"));
    assert!(tracker
        .db()
        .unsynced_transactions(tracker.user_id())
        .unwrap()
        .is_empty());
}
