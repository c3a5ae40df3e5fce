//! Utterance interpreter
//!
//! Turns one free-text Vietnamese utterance into an [`InterpretationResult`].
//! Interpretation runs in two stages:
//!
//! 1. The language model, if one is configured, called at most once and
//!    bounded by a timeout. Its outcome is a `Result` whose error side names
//!    why nothing usable came back.
//! 2. A pure function consuming that result. A usable answer is returned as
//!    is; anything else is replaced by the deterministic rule-based parser.
//!
//! The rule-based parser lives in the submodules: [`intent`] classifies,
//! [`expense`], [`balance`], [`delete`] and [`stats`] extract fields, all
//! driven by the keyword table in [`keywords`].

pub mod balance;
pub mod delete;
pub mod expense;
pub mod intent;
pub mod keywords;
pub mod price;
pub mod stats;
pub mod text;
pub mod when;

pub use intent::Intent;

use std::collections::BTreeMap;
use std::num::NonZeroU64;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveTime, Timelike};
use tracing::debug;

use crate::ai::{
    AIBackend, AIClient, BalanceFields, DeleteFields, ExpenseFields, LlmExtraction, LlmIntent,
    StatisticsFields,
};
use crate::config::LlmConfig;
use crate::error::Error;
use crate::models::{
    BalanceAccount, BalanceOperation, BalanceUpdate, DeleteIntent, Interpretation,
    InterpretationResult, InterpretationSource, MealTime, ParseFailure, ParsedExpense,
    StatisticsRequest, StatsPeriod, TransactionKind, UpstreamIssue, MAX_STATS_DAYS,
};

/// Explicit inputs besides the utterance itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpretContext {
    pub today: NaiveDate,
    /// Clock time used for expenses dated today without an explicit time
    pub now: Option<NaiveTime>,
    /// Ledger owner; a tracker only applies contexts for its own user
    pub user: String,
}

impl InterpretContext {
    pub fn new(today: NaiveDate, user: &str) -> Self {
        Self {
            today,
            now: None,
            user: user.to_string(),
        }
    }

    /// Context for the local wall clock, to the minute
    pub fn current(user: &str) -> Self {
        let now = Local::now();
        Self {
            today: now.date_naive(),
            now: NaiveTime::from_hms_opt(now.hour(), now.minute(), 0),
            user: user.to_string(),
        }
    }

    pub fn at(mut self, time: NaiveTime) -> Self {
        self.now = Some(time);
        self
    }
}

/// Interpret with the rules only. Pure and total.
pub fn interpret_rules(utterance: &str, ctx: &InterpretContext) -> InterpretationResult {
    let text = text::normalize(utterance);
    interpret_rules_as(intent::classify(&text, ctx.today), utterance, ctx)
}

/// Interpret with the rules, skipping classification
pub fn interpret_rules_as(
    intent: Intent,
    utterance: &str,
    ctx: &InterpretContext,
) -> InterpretationResult {
    let text = text::normalize(utterance);
    match intent {
        Intent::AddExpense => match expense::extract_expense(&text, ctx) {
            Ok(expense) => InterpretationResult::Expense(expense),
            Err(failure) => InterpretationResult::Failure(failure),
        },
        Intent::UpdateBalance => match balance::extract_balance(&text, ctx.today) {
            Ok(update) => InterpretationResult::Balance(update),
            Err(failure) => InterpretationResult::Failure(failure),
        },
        Intent::Delete => InterpretationResult::Delete(delete::extract_delete(&text, ctx.today)),
        Intent::Statistics => InterpretationResult::Statistics(stats::extract_statistics(&text)),
        Intent::Unknown => InterpretationResult::Failure(ParseFailure::UnrecognizedIntent),
    }
}

/// Outcome of the language-model stage
pub type ModelOutcome = std::result::Result<InterpretationResult, UpstreamIssue>;

/// Second stage: keep a usable model answer, otherwise run the rules
pub fn resolve(outcome: ModelOutcome, utterance: &str, ctx: &InterpretContext) -> Interpretation {
    match outcome {
        Ok(result) => Interpretation {
            result,
            source: InterpretationSource::Llm,
        },
        Err(issue) => {
            debug!(reason = %issue, "Using rule-based parser");
            Interpretation {
                result: interpret_rules(utterance, ctx),
                source: InterpretationSource::Rules,
            }
        }
    }
}

/// Interpreter with an optional language model in front of the rules
///
/// Holds no per-call state; clone it freely.
#[derive(Clone)]
pub struct Interpreter {
    llm: Option<AIClient>,
    timeout: Duration,
    min_confidence: f64,
}

impl Interpreter {
    pub fn rules_only() -> Self {
        Self {
            llm: None,
            timeout: Duration::from_secs(10),
            min_confidence: 0.6,
        }
    }

    pub fn with_llm(client: AIClient, timeout: Duration, min_confidence: f64) -> Self {
        Self {
            llm: Some(client),
            timeout,
            min_confidence,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        match AIClient::from_config(config) {
            Some(client) => Self::with_llm(client, config.timeout, config.min_confidence),
            None => Self::rules_only(),
        }
    }

    pub fn llm(&self) -> Option<&AIClient> {
        self.llm.as_ref()
    }

    /// Interpret one utterance
    pub async fn interpret(&self, utterance: &str, ctx: &InterpretContext) -> Interpretation {
        let outcome = self.ask_model(utterance, ctx).await;
        resolve(outcome, utterance, ctx)
    }

    /// Interpret with a known intent (explicit CLI commands); rules only
    pub fn interpret_as(
        &self,
        intent: Intent,
        utterance: &str,
        ctx: &InterpretContext,
    ) -> Interpretation {
        Interpretation {
            result: interpret_rules_as(intent, utterance, ctx),
            source: InterpretationSource::Manual,
        }
    }

    /// First stage: one bounded call to the model
    pub async fn ask_model(&self, utterance: &str, ctx: &InterpretContext) -> ModelOutcome {
        let client = self.llm.as_ref().ok_or(UpstreamIssue::NotConfigured)?;

        let call = client.interpret_utterance(utterance, ctx.today);
        let extraction = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(extraction)) => extraction,
            Ok(Err(e)) => return Err(issue_from_error(&e)),
            Err(_) => {
                return Err(UpstreamIssue::Timeout {
                    secs: self.timeout.as_secs(),
                })
            }
        };

        from_extraction(extraction, utterance, ctx, self.min_confidence)
    }
}

fn issue_from_error(error: &Error) -> UpstreamIssue {
    match error {
        Error::Http(e) if e.is_timeout() => UpstreamIssue::Timeout { secs: 0 },
        Error::InvalidData(message) => UpstreamIssue::Malformed {
            message: message.clone(),
        },
        Error::Json(e) => UpstreamIssue::Malformed {
            message: e.to_string(),
        },
        other => UpstreamIssue::Transport {
            message: other.to_string(),
        },
    }
}

fn malformed(message: &str) -> UpstreamIssue {
    UpstreamIssue::Malformed {
        message: message.to_string(),
    }
}

/// Validate a model answer into a typed result
pub fn from_extraction(
    extraction: LlmExtraction,
    utterance: &str,
    ctx: &InterpretContext,
    min_confidence: f64,
) -> ModelOutcome {
    let confidence = extraction.confidence;
    if !confidence.is_finite() || confidence < min_confidence {
        return Err(UpstreamIssue::LowConfidence { confidence });
    }

    let text = text::normalize(utterance);
    match extraction.intent {
        LlmIntent::AddExpense => {
            let fields = extraction
                .expense
                .ok_or_else(|| malformed("add_expense without expense fields"))?;
            expense_from_fields(fields, &text, ctx).map(InterpretationResult::Expense)
        }
        LlmIntent::UpdateBalance => {
            let fields = extraction
                .balance
                .ok_or_else(|| malformed("update_balance without balance fields"))?;
            balance_from_fields(fields).map(InterpretationResult::Balance)
        }
        LlmIntent::DeleteExpense => Ok(InterpretationResult::Delete(delete_from_fields(
            extraction.delete.unwrap_or_default(),
        ))),
        LlmIntent::ViewStatistics => Ok(InterpretationResult::Statistics(stats_from_fields(
            extraction.statistics.unwrap_or_default(),
        ))),
        LlmIntent::Unknown => Err(UpstreamIssue::Unclassified),
    }
}

/// Whole dong from a model amount; negative, fractional noise and NaN rejected
fn whole_amount(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value < u64::MAX as f64).then(|| value.round() as u64)
}

fn expense_from_fields(
    fields: ExpenseFields,
    text: &str,
    ctx: &InterpretContext,
) -> std::result::Result<ParsedExpense, UpstreamIssue> {
    let food_item = fields.food_item.trim().to_lowercase();
    if food_item.is_empty() {
        return Err(malformed("empty food_item"));
    }

    let mut price = fields
        .price
        .and_then(whole_amount)
        .filter(|p| *p > 0)
        .ok_or_else(|| malformed("missing or non-positive price"))?;

    // Models often drop the thousands multiplier ("35k" read as 35)
    if price < 1000 {
        if let Some(token) = price::extract_price(&when::masked(text, ctx.today)) {
            if token.has_unit && token.value >= 1000 {
                debug!(model = price, rules = token.value, "Correcting model price");
                price = token.value;
            }
        }
    }
    let price = NonZeroU64::new(price).ok_or_else(|| malformed("zero price"))?;

    let meal_time = fields
        .meal_time
        .as_deref()
        .and_then(|m| m.parse().ok())
        .unwrap_or(MealTime::Unknown);

    let date = fields
        .date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
        .unwrap_or(ctx.today);
    let time = fields
        .time
        .as_deref()
        .and_then(|t| {
            NaiveTime::parse_from_str(t.trim(), "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(t.trim(), "%H:%M:%S"))
                .ok()
        })
        .or(if date == ctx.today { ctx.now } else { None });

    let kind = fields
        .transaction_type
        .as_deref()
        .and_then(|k| k.parse().ok())
        .unwrap_or(TransactionKind::Expense);

    let mut account = fields
        .account_type
        .as_deref()
        .and_then(|a| a.parse().ok())
        .unwrap_or(BalanceAccount::Cash);
    // An explicit bank-transfer word beats whatever the model said
    let pays_by_bank = keywords::scan(text)
        .iter()
        .any(|h| h.role == keywords::Role::Payment(BalanceAccount::BankAccount));
    if pays_by_bank {
        account = BalanceAccount::BankAccount;
    }

    Ok(ParsedExpense {
        food_item,
        price,
        meal_time,
        date,
        time,
        kind,
        account,
    })
}

fn balance_from_fields(fields: BalanceFields) -> std::result::Result<BalanceUpdate, UpstreamIssue> {
    let operation = match fields.operation.as_deref().map(str::trim) {
        Some("add") => BalanceOperation::Add,
        _ => BalanceOperation::Set,
    };

    let mut amounts = BTreeMap::new();
    for (account, value) in [
        (BalanceAccount::Cash, fields.cash),
        (BalanceAccount::BankAccount, fields.account),
    ] {
        if let Some(value) = value {
            let amount = whole_amount(value).ok_or_else(|| malformed("invalid balance amount"))?;
            amounts.insert(account, amount);
        }
    }

    BalanceUpdate::new(amounts, operation).ok_or_else(|| malformed("balance without amounts"))
}

fn delete_from_fields(fields: DeleteFields) -> DeleteIntent {
    if fields.delete_recent {
        return DeleteIntent::most_recent();
    }
    DeleteIntent {
        query: fields
            .food_item
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty()),
        price: fields.price.and_then(whole_amount).filter(|p| *p > 0),
        meal_time: fields
            .meal_time
            .as_deref()
            .and_then(|m| m.parse().ok())
            .filter(|m| *m != MealTime::Unknown),
    }
}

fn stats_from_fields(fields: StatisticsFields) -> StatisticsRequest {
    let period = match (fields.period.as_deref().map(str::trim), fields.days) {
        (_, Some(n)) if n > 0 => StatsPeriod::Days(n.min(MAX_STATS_DAYS)),
        (Some("daily"), _) => StatsPeriod::Today,
        (Some("weekly"), _) => StatsPeriod::Week,
        (Some("monthly"), _) => StatsPeriod::Month,
        (Some(p), _) => p.parse().unwrap_or_default(),
        (None, _) => StatsPeriod::Today,
    };
    StatisticsRequest { period }
}
