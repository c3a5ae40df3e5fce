//! Balance update extraction
//!
//! The utterance is cut into segments on `,` `;` and "và". Inside a segment
//! every balance noun claims the first free amount after it (stopping at the
//! next noun), otherwise the closest free amount before it. Anything left
//! unpaired is a failure: a noun without an amount or an amount without a noun.

use std::collections::BTreeMap;
use std::ops::Range;

use chrono::NaiveDate;

use super::keywords::{self, Hit, Role};
use super::price::{find_prices, PriceToken};
use super::when;
use crate::models::{BalanceAccount, BalanceOperation, BalanceUpdate, ParseFailure};

/// Extract a balance update from normalized text
pub fn extract_balance(
    text: &str,
    today: NaiveDate,
) -> std::result::Result<BalanceUpdate, ParseFailure> {
    let masked = when::masked(text, today);
    let hits = keywords::scan(&masked);
    let prices = find_prices(&masked);

    let operation = if hits
        .iter()
        .any(|h| matches!(h.role, Role::AddMarker | Role::Deposit))
    {
        BalanceOperation::Add
    } else {
        BalanceOperation::Set
    };

    let mut amounts = BTreeMap::new();
    for segment in segments(&masked, &hits) {
        let targets: Vec<(BalanceAccount, &Hit)> = hits
            .iter()
            .filter(|h| within(&segment, h.start..h.end))
            .filter_map(|h| match h.role {
                Role::Balance(acct) => Some((acct, h)),
                _ => None,
            })
            .collect();
        let local: Vec<&PriceToken> = prices
            .iter()
            .filter(|p| within(&segment, p.span.clone()))
            .collect();

        for (acct, value) in pair(&targets, &local, segment.end)? {
            amounts.insert(acct, value);
        }
    }

    BalanceUpdate::new(amounts, operation).ok_or(ParseFailure::NoTargetForAmount)
}

fn within(outer: &Range<usize>, inner: Range<usize>) -> bool {
    inner.start >= outer.start && inner.end <= outer.end
}

/// Byte ranges between separators. A comma between two digits ("1,5 triệu")
/// is part of a number, not a separator.
fn segments(text: &str, hits: &[Hit]) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut cuts: Vec<Range<usize>> = text
        .char_indices()
        .filter(|&(i, c)| {
            let between_digits = i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit());
            c == ';' || (c == ',' && !between_digits)
        })
        .map(|(i, _)| i..i + 1)
        .collect();
    cuts.extend(
        hits.iter()
            .filter(|h| h.role == Role::Conjunction)
            .map(|h| h.start..h.end),
    );
    cuts.sort_by_key(|r| r.start);

    let mut out = Vec::with_capacity(cuts.len() + 1);
    let mut cursor = 0;
    for cut in cuts {
        out.push(cursor..cut.start);
        cursor = cut.end;
    }
    out.push(cursor..text.len());
    out
}

/// Pair targets with amounts inside one segment
fn pair(
    targets: &[(BalanceAccount, &Hit)],
    prices: &[&PriceToken],
    segment_end: usize,
) -> std::result::Result<Vec<(BalanceAccount, u64)>, ParseFailure> {
    let mut claimed = vec![false; prices.len()];
    let mut pairs = Vec::with_capacity(targets.len());

    for (i, (acct, hit)) in targets.iter().enumerate() {
        let limit = targets
            .get(i + 1)
            .map(|(_, next)| next.start)
            .unwrap_or(segment_end);

        let after = prices
            .iter()
            .enumerate()
            .find(|(j, p)| !claimed[*j] && p.span.start >= hit.end && p.span.start < limit)
            .map(|(j, _)| j);
        let chosen = after.or_else(|| {
            prices
                .iter()
                .enumerate()
                .filter(|(j, p)| !claimed[*j] && p.span.end <= hit.start)
                .last()
                .map(|(j, _)| j)
        });

        let j = chosen.ok_or(ParseFailure::NoTargetForAmount)?;
        claimed[j] = true;
        pairs.push((*acct, prices[j].value));
    }

    if claimed.iter().any(|c| !c) {
        return Err(ParseFailure::NoTargetForAmount);
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BalanceTarget;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 20).unwrap()
    }

    #[test]
    fn test_update_cash() {
        let update = extract_balance("cập nhật tiền mặt 500k", today()).unwrap();
        assert_eq!(update.target(), BalanceTarget::Cash);
        assert_eq!(update.amount(BalanceAccount::Cash), Some(500_000));
        assert_eq!(update.operation(), BalanceOperation::Set);
    }

    #[test]
    fn test_both_targets_comma() {
        let update = extract_balance("tiền mặt 100k, tài khoản 1 triệu", today()).unwrap();
        assert_eq!(update.target(), BalanceTarget::Both);
        assert_eq!(update.amount(BalanceAccount::Cash), Some(100_000));
        assert_eq!(update.amount(BalanceAccount::BankAccount), Some(1_000_000));
    }

    #[test]
    fn test_both_targets_conjunction_and_amount_first() {
        let update = extract_balance("còn 200k tiền mặt và 3,5 triệu tài khoản", today()).unwrap();
        assert_eq!(update.amount(BalanceAccount::Cash), Some(200_000));
        assert_eq!(update.amount(BalanceAccount::BankAccount), Some(3_500_000));
    }

    #[test]
    fn test_add_operation() {
        let update = extract_balance("nạp thêm tài khoản 2 triệu", today()).unwrap();
        assert_eq!(update.target(), BalanceTarget::BankAccount);
        assert_eq!(update.operation(), BalanceOperation::Add);
    }

    #[test]
    fn test_target_without_amount() {
        assert_eq!(
            extract_balance("cập nhật tiền mặt", today()),
            Err(ParseFailure::NoTargetForAmount)
        );
        assert_eq!(
            extract_balance("tiền mặt 100k, tài khoản", today()),
            Err(ParseFailure::NoTargetForAmount)
        );
    }

    #[test]
    fn test_amount_without_target() {
        assert_eq!(
            extract_balance("tiền mặt 100k, 200k", today()),
            Err(ParseFailure::NoTargetForAmount)
        );
        assert_eq!(
            extract_balance("cập nhật 500k", today()),
            Err(ParseFailure::NoTargetForAmount)
        );
    }

    #[test]
    fn test_zero_balance() {
        let update = extract_balance("cập nhật tiền mặt 0đ", today()).unwrap();
        assert_eq!(update.amount(BalanceAccount::Cash), Some(0));
        assert_eq!(update.operation(), BalanceOperation::Set);

        let update = extract_balance("tiền mặt 0k, tài khoản 2 triệu", today()).unwrap();
        assert_eq!(update.target(), BalanceTarget::Both);
        assert_eq!(update.amount(BalanceAccount::Cash), Some(0));
    }

    #[test]
    fn test_same_account_twice_last_wins() {
        let update = extract_balance("tiền mặt 100k, tiền mặt 150k", today()).unwrap();
        assert_eq!(update.target(), BalanceTarget::Cash);
        assert_eq!(update.amount(BalanceAccount::Cash), Some(150_000));
    }
}
