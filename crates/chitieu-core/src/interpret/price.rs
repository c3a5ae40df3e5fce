//! Price token recognition
//!
//! Recognized forms:
//! - `35k` / `35 k` → 35,000
//! - `35 nghìn` / `35 ngàn` → 35,000
//! - `2 triệu` / `2tr` / `1.5 triệu` → 2,000,000 / 1,500,000
//! - `35000`, `35.000`, `35,000` (at least 3 digits without a unit)
//! - `35000đ`, `35.000 đồng`, `35000 vnd`
//!
//! Clock times and dates must be masked out before scanning (see
//! [`super::when`]).

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

/// A monetary amount found in an utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceToken {
    /// Amount in dong
    pub value: u64,
    /// Byte span of the token, unit word included
    pub span: Range<usize>,
    /// Whether a currency or multiplier word was attached
    pub has_unit: bool,
}

fn price_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?P<num>\d+(?:[.,]\d+)*)(?:\s*(?P<unit>nghìn|nghin|ngàn|ngan|triệu|trieu|tr|k|đồng|dong|vnđ|vnd|đ)\b)?",
        )
        .expect("invalid price regex")
    })
}

fn multiplier(unit: &str) -> u64 {
    match unit {
        "k" | "nghìn" | "nghin" | "ngàn" | "ngan" => 1_000,
        "triệu" | "trieu" | "tr" => 1_000_000,
        _ => 1,
    }
}

/// Parse a digit run with optional `.`/`,` separators under a multiplier
///
/// With a multiplier above 1, a single separator followed by one or two
/// digits is a decimal point ("1.5 triệu"). Otherwise separators group
/// thousands ("100.000").
fn parse_amount(num: &str, mult: u64) -> Option<u64> {
    let separators: Vec<usize> = num
        .char_indices()
        .filter(|(_, c)| *c == '.' || *c == ',')
        .map(|(i, _)| i)
        .collect();

    if mult > 1 && separators.len() == 1 {
        let (int_part, frac_part) = num.split_at(separators[0]);
        let frac_part = &frac_part[1..];
        if (1..=2).contains(&frac_part.len()) {
            let scale = 10u64.pow(frac_part.len() as u32);
            let mantissa: u64 = format!("{}{}", int_part, frac_part).parse().ok()?;
            return mantissa.checked_mul(mult).map(|v| v / scale);
        }
    }

    let digits: String = num.chars().filter(|c| c.is_ascii_digit()).collect();
    let value: u64 = digits.parse().ok()?;
    value.checked_mul(mult)
}

/// Find every price-like token, left to right
pub fn find_prices(text: &str) -> Vec<PriceToken> {
    price_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let num = caps.name("num")?.as_str();
            let unit = caps.name("unit").map(|u| u.as_str());

            if unit.is_none() {
                let digit_count = num.chars().filter(|c| c.is_ascii_digit()).count();
                if digit_count < 3 {
                    return None;
                }
            }

            let value = parse_amount(num, unit.map(multiplier).unwrap_or(1))?;

            Some(PriceToken {
                value,
                span: whole.range(),
                has_unit: unit.is_some(),
            })
        })
        .collect()
}

/// Choose the price among candidate tokens
///
/// Tokens with a unit word beat bare numbers; among equals the last token
/// in the sentence wins.
pub fn pick_price(tokens: &[PriceToken]) -> Option<&PriceToken> {
    tokens
        .iter()
        .rev()
        .find(|t| t.has_unit)
        .or_else(|| tokens.last())
}

/// Find and choose the price in one step
pub fn extract_price(text: &str) -> Option<PriceToken> {
    pick_price(&find_prices(text)).cloned()
}
