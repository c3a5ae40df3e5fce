//! Language-model response types
//!
//! These mirror the JSON schema requested by the `interpret_utterance`
//! prompt and are shared by every backend. Nothing here is validated yet;
//! the interpreter turns an [`LlmExtraction`] into a typed result or rejects it.

use serde::{Deserialize, Deserializer, Serialize};

/// Intent label as reported by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmIntent {
    AddExpense,
    UpdateBalance,
    DeleteExpense,
    ViewStatistics,
    #[serde(other)]
    Unknown,
}

/// One structured answer from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmExtraction {
    pub intent: LlmIntent,
    /// Missing confidence is read as full confidence
    #[serde(default = "full_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub expense: Option<ExpenseFields>,
    #[serde(default)]
    pub balance: Option<BalanceFields>,
    #[serde(default)]
    pub delete: Option<DeleteFields>,
    #[serde(default)]
    pub statistics: Option<StatisticsFields>,
}

fn full_confidence() -> f64 {
    1.0
}

impl LlmExtraction {
    /// An extraction with only the intent and confidence filled in
    pub fn bare(intent: LlmIntent, confidence: f64) -> Self {
        Self {
            intent,
            confidence,
            expense: None,
            balance: None,
            delete: None,
            statistics: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseFields {
    #[serde(default)]
    pub food_item: String,
    #[serde(default, deserialize_with = "amount")]
    pub price: Option<f64>,
    #[serde(default)]
    pub meal_time: Option<String>,
    /// YYYY-MM-DD
    #[serde(default)]
    pub date: Option<String>,
    /// HH:MM
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub transaction_type: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceFields {
    /// "set" or "add"
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default, deserialize_with = "amount")]
    pub cash: Option<f64>,
    #[serde(default, deserialize_with = "amount")]
    pub account: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteFields {
    #[serde(default)]
    pub food_item: Option<String>,
    #[serde(default, deserialize_with = "amount")]
    pub price: Option<f64>,
    #[serde(default)]
    pub meal_time: Option<String>,
    #[serde(default)]
    pub delete_recent: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsFields {
    /// "today", "week", "month" or "days"
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub days: Option<u32>,
}

/// Models sometimes quote amounts ("35000", "35.000"); accept both forms
fn amount<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => {
            let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_intent_label() {
        let e: LlmExtraction =
            serde_json::from_str(r#"{"intent": "order_pizza", "confidence": 0.9}"#).unwrap();
        assert_eq!(e.intent, LlmIntent::Unknown);
    }

    #[test]
    fn test_missing_confidence_is_full() {
        let e: LlmExtraction = serde_json::from_str(r#"{"intent": "add_expense"}"#).unwrap();
        assert_eq!(e.confidence, 1.0);
        assert!(e.expense.is_none());
    }

    #[test]
    fn test_quoted_amounts() {
        let e: ExpenseFields =
            serde_json::from_str(r#"{"food_item": "phở", "price": "35.000"}"#).unwrap();
        assert_eq!(e.price, Some(35000.0));

        let b: BalanceFields = serde_json::from_str(r#"{"cash": 500000, "account": null}"#).unwrap();
        assert_eq!(b.cash, Some(500000.0));
        assert_eq!(b.account, None);
    }
}
