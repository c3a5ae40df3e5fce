//! Rule-based intent classification

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::keywords::{self, Hit, Role};
use super::price::find_prices;
use super::text::residual;
use super::when;

/// What an utterance asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    AddExpense,
    UpdateBalance,
    Delete,
    Statistics,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddExpense => "add_expense",
            Self::UpdateBalance => "update_balance",
            Self::Delete => "delete_expense",
            Self::Statistics => "view_statistics",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify normalized text
///
/// Precedence: delete, statistics, balance update, expense. A balance noun
/// signals an update when paired with an update marker or a top-up phrase,
/// or when nothing but balance nouns and amounts is left ("tiền mặt 100k,
/// tài khoản 1 triệu"). An expense needs a price-like token or a spending
/// verb, so "ăn phở" still classifies as an expense and then fails on its
/// price, while a meal word alone ("tối nay đi dạo") is unknown.
pub fn classify(text: &str, today: NaiveDate) -> Intent {
    let masked = when::masked(text, today);
    let hits = keywords::scan(&masked);
    let any = |pred: fn(&Role) -> bool| hits.iter().any(|h| pred(&h.role));

    if any(|r| matches!(r, Role::Delete)) {
        return Intent::Delete;
    }
    if any(|r| matches!(r, Role::Statistics)) {
        return Intent::Statistics;
    }
    if any(|r| matches!(r, Role::Balance(_))) {
        let marked = any(|r| matches!(r, Role::UpdateMarker | Role::Deposit));
        if marked || only_balance_words(&masked, &hits) {
            return Intent::UpdateBalance;
        }
    }

    let has_price = !find_prices(&masked).is_empty();
    let has_spending_word = any(|r| matches!(r, Role::Verb | Role::IncomeVerb | Role::Income));
    if has_price || has_spending_word {
        return Intent::AddExpense;
    }

    Intent::Unknown
}

fn only_balance_words(text: &str, hits: &[Hit]) -> bool {
    let mut spans: Vec<_> = hits
        .iter()
        .filter(|h| {
            matches!(
                h.role,
                Role::Balance(_)
                    | Role::UpdateMarker
                    | Role::Deposit
                    | Role::AddMarker
                    | Role::Conjunction
            )
        })
        .map(|h| h.start..h.end)
        .collect();
    spans.extend(find_prices(text).into_iter().map(|p| p.span));
    residual(text, &spans).is_empty()
}
