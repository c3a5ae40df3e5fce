//! Domain models for chitieu

use std::collections::BTreeMap;
use std::num::NonZeroU64;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse time-of-day bucket for a meal or purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MealTime {
    Morning,
    Noon,
    Afternoon,
    Evening,
    #[default]
    Unknown,
}

impl MealTime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Noon => "noon",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Unknown => "unknown",
        }
    }

    /// Vietnamese label used in CLI output and spreadsheet rows
    pub fn label_vi(&self) -> &'static str {
        match self {
            Self::Morning => "sáng",
            Self::Noon => "trưa",
            Self::Afternoon => "chiều",
            Self::Evening => "tối",
            Self::Unknown => "không rõ",
        }
    }

    pub fn all() -> &'static [MealTime] {
        &[
            Self::Morning,
            Self::Noon,
            Self::Afternoon,
            Self::Evening,
            Self::Unknown,
        ]
    }
}

impl std::str::FromStr for MealTime {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" | "sáng" | "breakfast" => Ok(Self::Morning),
            "noon" | "trưa" | "lunch" => Ok(Self::Noon),
            "afternoon" | "chiều" => Ok(Self::Afternoon),
            "evening" | "tối" | "đêm" | "dinner" | "night" => Ok(Self::Evening),
            "unknown" | "" | "không rõ" => Ok(Self::Unknown),
            _ => Err(format!("Unknown meal time: {}", s)),
        }
    }
}

impl std::fmt::Display for MealTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether money left or entered the wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    #[default]
    Expense,
    Income,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }

    /// Sign applied to the price when adjusting a balance
    pub fn sign(&self) -> i64 {
        match self {
            Self::Expense => -1,
            Self::Income => 1,
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "expense" | "chi" => Ok(Self::Expense),
            "income" | "thu" => Ok(Self::Income),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One of the two balances kept per user
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BalanceAccount {
    #[default]
    Cash,
    BankAccount,
}

impl BalanceAccount {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankAccount => "bank_account",
        }
    }

    pub fn label_vi(&self) -> &'static str {
        match self {
            Self::Cash => "tiền mặt",
            Self::BankAccount => "tài khoản",
        }
    }
}

impl std::str::FromStr for BalanceAccount {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "tiền mặt" | "tien mat" => Ok(Self::Cash),
            "bank_account" | "account" | "bank" | "tài khoản" | "tai khoan" | "ck" => {
                Ok(Self::BankAccount)
            }
            _ => Err(format!("Unknown balance account: {}", s)),
        }
    }
}

impl std::fmt::Display for BalanceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which balances an update instruction touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceTarget {
    Cash,
    BankAccount,
    Both,
}

impl BalanceTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankAccount => "bank_account",
            Self::Both => "both",
        }
    }
}

/// Replace the balance, or add to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BalanceOperation {
    #[default]
    Set,
    Add,
}

impl BalanceOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Add => "add",
        }
    }
}

/// A structured expense (or income) record extracted from one utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedExpense {
    pub food_item: String,
    /// Amount in dong
    pub price: NonZeroU64,
    pub meal_time: MealTime,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub kind: TransactionKind,
    pub account: BalanceAccount,
}

/// A balance-update instruction. Always carries at least one amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceUpdate {
    target: BalanceTarget,
    amounts: BTreeMap<BalanceAccount, u64>,
    operation: BalanceOperation,
}

impl BalanceUpdate {
    /// Returns `None` when `amounts` is empty.
    pub fn new(
        amounts: BTreeMap<BalanceAccount, u64>,
        operation: BalanceOperation,
    ) -> Option<Self> {
        let target = match (
            amounts.contains_key(&BalanceAccount::Cash),
            amounts.contains_key(&BalanceAccount::BankAccount),
        ) {
            (true, true) => BalanceTarget::Both,
            (true, false) => BalanceTarget::Cash,
            (false, true) => BalanceTarget::BankAccount,
            (false, false) => return None,
        };
        Some(Self {
            target,
            amounts,
            operation,
        })
    }

    /// Single-account convenience constructor
    pub fn single(account: BalanceAccount, amount: u64, operation: BalanceOperation) -> Self {
        let mut amounts = BTreeMap::new();
        amounts.insert(account, amount);
        let target = match account {
            BalanceAccount::Cash => BalanceTarget::Cash,
            BalanceAccount::BankAccount => BalanceTarget::BankAccount,
        };
        Self {
            target,
            amounts,
            operation,
        }
    }

    pub fn target(&self) -> BalanceTarget {
        self.target
    }

    pub fn amounts(&self) -> &BTreeMap<BalanceAccount, u64> {
        &self.amounts
    }

    pub fn amount(&self, account: BalanceAccount) -> Option<u64> {
        self.amounts.get(&account).copied()
    }

    pub fn operation(&self) -> BalanceOperation {
        self.operation
    }
}

/// Which prior transaction to remove
///
/// An absent query means "the most recent transaction".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct DeleteIntent {
    pub query: Option<String>,
    pub price: Option<u64>,
    pub meal_time: Option<MealTime>,
}

impl DeleteIntent {
    pub fn most_recent() -> Self {
        Self::default()
    }

    pub fn matching(query: &str) -> Self {
        Self {
            query: Some(query.to_string()),
            ..Self::default()
        }
    }

    pub fn is_most_recent(&self) -> bool {
        self.query.is_none() && self.price.is_none() && self.meal_time.is_none()
    }
}

/// Longest window a `Days` period may cover
pub const MAX_STATS_DAYS: u32 = 3650;

/// Window for a statistics request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatsPeriod {
    #[default]
    Today,
    Week,
    Month,
    Days(u32),
}

impl StatsPeriod {
    /// Inclusive date range ending at `today`
    ///
    /// `Week` is the last 7 days, `Month` the current calendar month.
    pub fn range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Self::Today => (today, today),
            Self::Week => (today - Duration::days(6), today),
            Self::Month => (today.with_day(1).unwrap_or(today), today),
            Self::Days(n) => {
                let span = i64::from((*n).clamp(1, MAX_STATS_DAYS)) - 1;
                let from = today
                    .checked_sub_signed(Duration::days(span))
                    .unwrap_or(NaiveDate::MIN);
                (from, today)
            }
        }
    }

    pub fn label_vi(&self) -> String {
        match self {
            Self::Today => "hôm nay".to_string(),
            Self::Week => "7 ngày qua".to_string(),
            Self::Month => "tháng này".to_string(),
            Self::Days(n) => format!("{} ngày qua", n),
        }
    }
}

impl std::str::FromStr for StatsPeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "today" | "day" | "hôm nay" => return Ok(Self::Today),
            "week" | "tuần" => return Ok(Self::Week),
            "month" | "tháng" => return Ok(Self::Month),
            _ => {}
        }
        let digits = s
            .strip_prefix("days:")
            .or_else(|| s.strip_suffix('d'))
            .unwrap_or(s.as_str());
        match digits.parse::<u32>() {
            Ok(n) if (1..=MAX_STATS_DAYS).contains(&n) => Ok(Self::Days(n)),
            Ok(n) if n > MAX_STATS_DAYS => Err(format!(
                "Period too long: {} days (at most {})",
                n, MAX_STATS_DAYS
            )),
            _ => Err(format!(
                "Unknown period: {} (use today, week, month or days:N)",
                s
            )),
        }
    }
}

/// Request to show spending statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct StatisticsRequest {
    pub period: StatsPeriod,
}

/// Why the language-understanding stage produced nothing usable
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UpstreamIssue {
    /// No backend configured, or offline mode
    NotConfigured,
    /// The call did not finish within the timeout
    Timeout { secs: u64 },
    /// Network or HTTP failure
    Transport { message: String },
    /// The response did not match the extraction schema
    Malformed { message: String },
    /// The backend reported confidence below the threshold
    LowConfidence { confidence: f64 },
    /// The backend could not classify the utterance
    Unclassified,
}

impl std::fmt::Display for UpstreamIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "no language model configured"),
            Self::Timeout { secs } => write!(f, "timed out after {}s", secs),
            Self::Transport { message } => write!(f, "transport error: {}", message),
            Self::Malformed { message } => write!(f, "malformed response: {}", message),
            Self::LowConfidence { confidence } => write!(f, "low confidence ({:.2})", confidence),
            Self::Unclassified => write!(f, "utterance not classified"),
        }
    }
}

/// Terminal outcome for an utterance that could not be interpreted
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "failure", rename_all = "snake_case")]
pub enum ParseFailure {
    #[error("no price found in the message")]
    NoPriceFound,
    #[error("could not tell what was bought")]
    AmbiguousItem,
    #[error("an amount or balance name is missing its partner")]
    NoTargetForAmount,
    #[error("message not recognized")]
    UnrecognizedIntent,
    /// Only produced by the language-model stage; always recovered by the rules.
    #[error("language model unavailable: {0}")]
    UpstreamUnavailable(UpstreamIssue),
}

impl ParseFailure {
    /// Vietnamese hint shown to the user after a failure
    pub fn hint_vi(&self) -> &'static str {
        match self {
            Self::NoPriceFound => "Hãy thêm số tiền, ví dụ: 'trưa ăn phở 35k'",
            Self::AmbiguousItem => "Hãy ghi rõ món, ví dụ: 'ăn bún chả 40 nghìn'",
            Self::NoTargetForAmount => {
                "Hãy ghép mỗi số tiền với 'tiền mặt' hoặc 'tài khoản', ví dụ: 'tiền mặt 100k, tài khoản 1 triệu'"
            }
            Self::UnrecognizedIntent => {
                "Thử: 'sáng ăn bánh mì 20k', 'cập nhật tiền mặt 500k', 'xóa phở', 'thống kê tuần'"
            }
            Self::UpstreamUnavailable(_) => "Đang dùng bộ phân tích dự phòng",
        }
    }
}

/// Tagged result of interpreting one utterance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum InterpretationResult {
    Expense(ParsedExpense),
    Balance(BalanceUpdate),
    Delete(DeleteIntent),
    Statistics(StatisticsRequest),
    Failure(ParseFailure),
}

impl InterpretationResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// Which stage produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InterpretationSource {
    Llm,
    #[default]
    Rules,
    /// Entered through an explicit CLI command rather than free text
    Manual,
}

impl InterpretationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Rules => "rules",
            Self::Manual => "manual",
        }
    }
}

impl std::str::FromStr for InterpretationSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "llm" => Ok(Self::Llm),
            "rules" => Ok(Self::Rules),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("Unknown interpretation source: {}", s)),
        }
    }
}

impl std::fmt::Display for InterpretationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An interpretation result together with the stage that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpretation {
    pub result: InterpretationResult,
    pub source: InterpretationSource,
}

/// A stored transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub food_item: String,
    pub price: i64,
    pub meal_time: MealTime,
    pub kind: TransactionKind,
    pub account: BalanceAccount,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub source: InterpretationSource,
    pub synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Signed effect of this transaction on its balance
    pub fn balance_delta(&self) -> i64 {
        self.kind.sign() * self.price
    }
}

/// Filters for finding prior transactions
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    /// Case-insensitive substring of the item
    pub text: Option<String>,
    pub price: Option<i64>,
    pub meal_time: Option<MealTime>,
}

impl From<&DeleteIntent> for TransactionQuery {
    fn from(intent: &DeleteIntent) -> Self {
        Self {
            text: intent.query.clone(),
            price: intent.price.and_then(|p| i64::try_from(p).ok()),
            meal_time: intent.meal_time,
        }
    }
}

/// Current balances for a user (may go negative)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Balance {
    pub cash: i64,
    pub bank_account: i64,
}

impl Balance {
    pub fn get(&self, account: BalanceAccount) -> i64 {
        match account {
            BalanceAccount::Cash => self.cash,
            BalanceAccount::BankAccount => self.bank_account,
        }
    }

    pub fn total(&self) -> i64 {
        self.cash + self.bank_account
    }
}

/// Aggregate spending over a date range
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct SpendingSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Number of expense transactions
    pub count: i64,
    pub total_expense: i64,
    pub total_income: i64,
    pub average: f64,
    pub min: i64,
    pub max: i64,
}

/// Totals for a single day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub count: i64,
    pub total: i64,
}

/// Totals for a run of consecutive days
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodTotal {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub count: i64,
    pub total: i64,
}

/// Format an amount in dong with dot thousands separators ("35.000đ")
pub fn format_vnd(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    if amount < 0 {
        format!("-{}đ", out)
    } else {
        format!("{}đ", out)
    }
}
