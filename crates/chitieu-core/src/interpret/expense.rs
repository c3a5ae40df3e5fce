//! Expense field extraction: price, meal time, item, date

use std::num::NonZeroU64;

use chrono::Duration;

use super::keywords::{self, Role};
use super::price::extract_price;
use super::text::residual;
use super::when::take_moments;
use super::InterpretContext;
use crate::models::{BalanceAccount, MealTime, ParseFailure, ParsedExpense, TransactionKind};

/// Extract an expense from normalized text
///
/// The item is what remains after removing the meal word, the first verb,
/// the price, times/dates, day phrases, payment words and fillers.
pub fn extract_expense(
    text: &str,
    ctx: &InterpretContext,
) -> std::result::Result<ParsedExpense, ParseFailure> {
    let mut masked = text.to_string();
    let moments = take_moments(&mut masked, ctx.today);

    let price = extract_price(&masked).ok_or(ParseFailure::NoPriceFound)?;
    let value = NonZeroU64::new(price.value).ok_or(ParseFailure::NoPriceFound)?;

    let hits = keywords::scan(&masked);
    let mut removed = vec![price.span.clone()];

    let meal_time = match keywords::first(&hits, |r| matches!(r, Role::Meal(_))) {
        Some(hit) => {
            removed.push(hit.start..hit.end);
            match hit.role {
                Role::Meal(meal) => meal,
                _ => MealTime::Unknown,
            }
        }
        None => MealTime::Unknown,
    };

    if let Some(verb) = keywords::first(&hits, |r| matches!(r, Role::Verb | Role::IncomeVerb)) {
        removed.push(verb.start..verb.end);
    }

    let mut kind = TransactionKind::Expense;
    let mut account = None;
    let mut day_offset = None;
    for hit in &hits {
        match hit.role {
            Role::IncomeVerb | Role::Income => kind = TransactionKind::Income,
            Role::Balance(acct) | Role::Payment(acct) => {
                account.get_or_insert(acct);
                removed.push(hit.start..hit.end);
            }
            Role::RelativeDay(offset) => {
                day_offset.get_or_insert(offset);
                removed.push(hit.start..hit.end);
            }
            Role::Filler | Role::AddMarker | Role::Deposit => removed.push(hit.start..hit.end),
            _ => {}
        }
    }

    let food_item = residual(&masked, &removed);
    if food_item.is_empty() {
        return Err(ParseFailure::AmbiguousItem);
    }

    let date = match (moments.date, day_offset) {
        (Some(date), _) => date,
        (None, Some(offset)) => ctx.today + Duration::days(offset),
        (None, None) => ctx.today,
    };
    let time = match moments.time {
        Some(time) => Some(time),
        None if date == ctx.today => ctx.now,
        None => None,
    };

    Ok(ParsedExpense {
        food_item,
        price: value,
        meal_time,
        date,
        time,
        kind,
        account: account.unwrap_or(BalanceAccount::Cash),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn ctx() -> InterpretContext {
        InterpretContext {
            today: NaiveDate::from_ymd_opt(2024, 10, 20).unwrap(),
            now: NaiveTime::from_hms_opt(12, 5, 0),
            user: "default_user".to_string(),
        }
    }

    fn expense(text: &str) -> ParsedExpense {
        extract_expense(text, &ctx()).unwrap()
    }

    #[test]
    fn test_noon_pho() {
        let e = expense("trưa ăn phở 35k");
        assert_eq!(e.price.get(), 35_000);
        assert_eq!(e.food_item, "phở");
        assert_eq!(e.meal_time, MealTime::Noon);
        assert_eq!(e.date, ctx().today);
        assert_eq!(e.kind, TransactionKind::Expense);
        assert_eq!(e.account, BalanceAccount::Cash);
    }

    #[test]
    fn test_coffee_without_meal_word() {
        let e = expense("mua cà phê 25000");
        assert_eq!(e.price.get(), 25_000);
        assert_eq!(e.food_item, "cà phê");
        assert_eq!(e.meal_time, MealTime::Unknown);
    }

    #[test]
    fn test_thousand_word() {
        let e = expense("ăn bún chả 40 nghìn");
        assert_eq!(e.price.get(), 40_000);
        assert_eq!(e.food_item, "bún chả");
    }

    #[test]
    fn test_fillers_and_punctuation_removed() {
        let e = expense("tối uống trà sữa hết 45k.");
        assert_eq!(e.food_item, "trà sữa");
        assert_eq!(e.meal_time, MealTime::Evening);
    }

    #[test]
    fn test_only_first_verb_removed() {
        let e = expense("sáng ăn bánh mì uống cà phê 40k");
        assert_eq!(e.food_item, "bánh mì uống cà phê");
        assert_eq!(e.meal_time, MealTime::Morning);
    }

    #[test]
    fn test_bank_transfer_sets_account() {
        let e = expense("mua sách 120k ck");
        assert_eq!(e.account, BalanceAccount::BankAccount);
        assert_eq!(e.food_item, "sách");

        let e = expense("đổ xăng 50k bằng tiền mặt");
        assert_eq!(e.account, BalanceAccount::Cash);
        assert_eq!(e.food_item, "đổ xăng");
    }

    #[test]
    fn test_income() {
        let e = expense("lãnh lương 10 triệu");
        assert_eq!(e.kind, TransactionKind::Income);
        assert_eq!(e.food_item, "lương");
        assert_eq!(e.price.get(), 10_000_000);
    }

    #[test]
    fn test_relative_day_and_time() {
        let e = expense("hôm qua tối ăn lẩu 300k");
        assert_eq!(e.date, NaiveDate::from_ymd_opt(2024, 10, 19).unwrap());
        assert_eq!(e.food_item, "lẩu");
        assert_eq!(e.time, None);

        let e = expense("ăn phở lúc 7:30 35k");
        assert_eq!(e.time, NaiveTime::from_hms_opt(7, 30, 0));
        assert_eq!(e.food_item, "phở");

        // today without an explicit time uses the context clock
        let e = expense("ăn phở 35k");
        assert_eq!(e.time, ctx().now);
    }

    #[test]
    fn test_no_price() {
        assert_eq!(
            extract_expense("ăn phở", &ctx()),
            Err(ParseFailure::NoPriceFound)
        );
        assert_eq!(
            extract_expense("ăn phở 0k", &ctx()),
            Err(ParseFailure::NoPriceFound)
        );
    }

    #[test]
    fn test_ambiguous_item() {
        assert_eq!(
            extract_expense("trưa ăn 35k", &ctx()),
            Err(ParseFailure::AmbiguousItem)
        );
        assert_eq!(
            extract_expense("35k", &ctx()),
            Err(ParseFailure::AmbiguousItem)
        );
    }
}
