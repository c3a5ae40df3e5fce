//! Statistics request extraction

use std::sync::OnceLock;

use regex::Regex;

use super::keywords::{self, Role};
use crate::models::{StatisticsRequest, StatsPeriod};

fn days_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?P<n>\d{1,3})\s*ngày\b").expect("invalid days regex"))
}

/// Period requested by normalized text: "N ngày", then tuần / tháng / hôm nay,
/// defaulting to today.
pub fn extract_statistics(text: &str) -> StatisticsRequest {
    let days = days_regex()
        .captures(text)
        .and_then(|caps| caps["n"].parse::<u32>().ok())
        .filter(|n| *n > 0);
    if let Some(n) = days {
        return StatisticsRequest {
            period: StatsPeriod::Days(n),
        };
    }

    let period = keywords::scan(text)
        .iter()
        .find_map(|h| match h.role {
            Role::Period(period) => Some(period),
            Role::RelativeDay(0) => Some(StatsPeriod::Today),
            _ => None,
        })
        .unwrap_or_default();
    StatisticsRequest { period }
}
