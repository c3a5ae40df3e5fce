//! Keyword table for the rule-based interpreter
//!
//! Every phrase the rules react to lives in [`KEYWORDS`] with the role it
//! plays. Matching is whole-word and longest-phrase-first, so "tài khoản"
//! wins over "khoản" and "hôm nay" over any shorter overlap.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::{BalanceAccount, MealTime, StatsPeriod};

/// What a keyword means to the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Deletion verb or "most recent" marker
    Delete,
    /// Request for statistics
    Statistics,
    /// Balance update marker ("cập nhật", "còn")
    UpdateMarker,
    /// Top-up phrase: a balance update on its own, adding to the balance
    /// ("nạp", "thêm tiền vào")
    Deposit,
    /// "More" ("thêm", "cộng"). Makes a balance update add instead of
    /// replace, but is ordinary in expenses ("mua thêm") so it never
    /// signals an update by itself.
    AddMarker,
    /// Balance noun; also names the account an expense was paid from
    Balance(BalanceAccount),
    /// Payment method that implies an account but is not a balance noun
    Payment(BalanceAccount),
    Meal(MealTime),
    /// Spending verb removed from the item ("ăn", "uống", "mua")
    Verb,
    /// Receiving verb removed from the item ("lãnh", "nhận")
    IncomeVerb,
    /// Income noun kept in the item ("lương", "thưởng")
    Income,
    /// Day offset from today
    RelativeDay(i64),
    Period(StatsPeriod),
    /// Separates balance segments
    Conjunction,
    /// Noise word dropped from items and queries
    Filler,
}

pub struct Keyword {
    pub phrase: &'static str,
    pub role: Role,
}

const fn kw(phrase: &'static str, role: Role) -> Keyword {
    Keyword { phrase, role }
}

pub const KEYWORDS: &[Keyword] = &[
    // delete
    kw("xóa", Role::Delete),
    kw("xoá", Role::Delete),
    kw("xóa bỏ", Role::Delete),
    kw("xoá bỏ", Role::Delete),
    kw("hủy", Role::Delete),
    kw("huỷ", Role::Delete),
    kw("delete", Role::Delete),
    kw("gần nhất", Role::Delete),
    // statistics
    kw("thống kê", Role::Statistics),
    kw("báo cáo", Role::Statistics),
    kw("tổng kết", Role::Statistics),
    kw("tổng chi", Role::Statistics),
    kw("stats", Role::Statistics),
    // balance markers
    kw("cập nhật", Role::UpdateMarker),
    kw("còn", Role::UpdateMarker),
    kw("còn lại", Role::UpdateMarker),
    kw("số dư", Role::UpdateMarker),
    kw("set", Role::UpdateMarker),
    kw("update", Role::UpdateMarker),
    kw("nạp", Role::Deposit),
    kw("nạp thêm", Role::Deposit),
    kw("nạp tiền vào", Role::Deposit),
    kw("thêm tiền vào", Role::Deposit),
    kw("thêm", Role::AddMarker),
    kw("cộng", Role::AddMarker),
    // balance nouns
    kw("tiền mặt", Role::Balance(BalanceAccount::Cash)),
    kw("cash", Role::Balance(BalanceAccount::Cash)),
    kw("tiền túi", Role::Balance(BalanceAccount::Cash)),
    kw("tiền lẻ", Role::Balance(BalanceAccount::Cash)),
    kw("tài khoản", Role::Balance(BalanceAccount::BankAccount)),
    kw("ngân hàng", Role::Balance(BalanceAccount::BankAccount)),
    kw("bank", Role::Balance(BalanceAccount::BankAccount)),
    // payment methods
    kw("ck", Role::Payment(BalanceAccount::BankAccount)),
    kw("chuyển khoản", Role::Payment(BalanceAccount::BankAccount)),
    kw("quẹt thẻ", Role::Payment(BalanceAccount::BankAccount)),
    kw("thẻ", Role::Payment(BalanceAccount::BankAccount)),
    kw("atm", Role::Payment(BalanceAccount::BankAccount)),
    kw("banking", Role::Payment(BalanceAccount::BankAccount)),
    // meal times
    kw("sáng", Role::Meal(MealTime::Morning)),
    kw("trưa", Role::Meal(MealTime::Noon)),
    kw("chiều", Role::Meal(MealTime::Afternoon)),
    kw("tối", Role::Meal(MealTime::Evening)),
    kw("đêm", Role::Meal(MealTime::Evening)),
    kw("khuya", Role::Meal(MealTime::Evening)),
    // verbs
    kw("ăn", Role::Verb),
    kw("uống", Role::Verb),
    kw("mua", Role::Verb),
    kw("trả", Role::Verb),
    kw("lãnh", Role::IncomeVerb),
    kw("nhận", Role::IncomeVerb),
    kw("được trả", Role::IncomeVerb),
    // income nouns
    kw("lương", Role::Income),
    kw("tiền lương", Role::Income),
    kw("thu nhập", Role::Income),
    kw("thưởng", Role::Income),
    kw("tiền thưởng", Role::Income),
    // days
    kw("hôm nay", Role::RelativeDay(0)),
    kw("hôm qua", Role::RelativeDay(-1)),
    kw("hôm kia", Role::RelativeDay(-2)),
    // periods
    kw("tuần", Role::Period(StatsPeriod::Week)),
    kw("tuần này", Role::Period(StatsPeriod::Week)),
    kw("tháng", Role::Period(StatsPeriod::Month)),
    kw("tháng này", Role::Period(StatsPeriod::Month)),
    // structure
    kw("và", Role::Conjunction),
    kw("hết", Role::Filler),
    kw("giá", Role::Filler),
    kw("lúc", Role::Filler),
    kw("buổi", Role::Filler),
    kw("bữa", Role::Filler),
    kw("bằng", Role::Filler),
    kw("giao dịch", Role::Filler),
    kw("cuối", Role::Filler),
    kw("cuối cùng", Role::Filler),
    kw("vừa rồi", Role::Filler),
    kw("khoản", Role::Filler),
    kw("món", Role::Filler),
];

/// One keyword occurrence in an utterance (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub role: Role,
    pub start: usize,
    pub end: usize,
}

fn lookup() -> &'static HashMap<&'static str, Role> {
    static TABLE: OnceLock<HashMap<&'static str, Role>> = OnceLock::new();
    TABLE.get_or_init(|| KEYWORDS.iter().map(|k| (k.phrase, k.role)).collect())
}

fn keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let mut phrases: Vec<&str> = KEYWORDS.iter().map(|k| k.phrase).collect();
        phrases.sort_by_key(|p| std::cmp::Reverse(p.chars().count()));
        let alternation = phrases
            .iter()
            .map(|p| regex::escape(p).replace(' ', r"\s+"))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"\b(?:{})\b", alternation)).expect("invalid keyword regex")
    })
}

/// Find every keyword in already-normalized text, left to right
pub fn scan(text: &str) -> Vec<Hit> {
    keyword_regex()
        .find_iter(text)
        .filter_map(|m| {
            let phrase = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
            lookup().get(phrase.as_str()).map(|&role| Hit {
                role,
                start: m.start(),
                end: m.end(),
            })
        })
        .collect()
}

/// First hit matching a predicate
pub fn first<F>(hits: &[Hit], pred: F) -> Option<&Hit>
where
    F: Fn(&Role) -> bool,
{
    hits.iter().find(|h| pred(&h.role))
}
