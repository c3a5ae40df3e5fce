//! Clock times and calendar dates inside utterances
//!
//! Both are masked (overwritten with spaces) before price scanning so that
//! "12:30" or "15/10" never turn into amounts.

use std::ops::Range;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, NaiveTime};
use regex::Regex;

fn time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?P<h>\d{1,2})(?::(?P<m>\d{2})|h(?P<hm>\d{2})?p?|\s*giờ(?:\s*(?P<gm>\d{2})\s*phút)?)\b",
        )
        .expect("invalid time regex")
    })
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?P<d>\d{1,2})[/-](?P<m>\d{1,2})(?:[/-](?P<y>\d{2,4}))?\b")
            .expect("invalid date regex")
    })
}

/// Clock time and date found in an utterance, plus the byte spans they held
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Moments {
    pub time: Option<NaiveTime>,
    pub date: Option<NaiveDate>,
    pub spans: Vec<Range<usize>>,
}

/// Overwrite `span` in `text` with ASCII spaces, keeping byte offsets stable
pub fn blank(text: &mut String, span: Range<usize>) {
    let spaces = " ".repeat(span.len());
    text.replace_range(span, &spaces);
}

/// Extract the first clock time and first date, masking every match
///
/// Matches that are not valid times or dates are left in place.
pub fn take_moments(text: &mut String, today: NaiveDate) -> Moments {
    let mut moments = Moments::default();

    let dates: Vec<(Range<usize>, Option<NaiveDate>)> = date_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let day: u32 = caps.name("d")?.as_str().parse().ok()?;
            let month: u32 = caps.name("m")?.as_str().parse().ok()?;
            let year = match caps.name("y") {
                Some(y) => {
                    let y: i32 = y.as_str().parse().ok()?;
                    if y < 100 {
                        2000 + y
                    } else {
                        y
                    }
                }
                None => today.year(),
            };
            let date = NaiveDate::from_ymd_opt(year, month, day)?;
            Some((whole.range(), Some(date)))
        })
        .collect();

    for (span, date) in dates {
        if moments.date.is_none() {
            moments.date = date;
        }
        blank(text, span.clone());
        moments.spans.push(span);
    }

    let times: Vec<(Range<usize>, NaiveTime)> = time_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let hour: u32 = caps.name("h")?.as_str().parse().ok()?;
            let minute: u32 = match caps
                .name("m")
                .or_else(|| caps.name("hm"))
                .or_else(|| caps.name("gm"))
            {
                Some(m) => m.as_str().parse().ok()?,
                None => 0,
            };
            NaiveTime::from_hms_opt(hour, minute, 0).map(|t| (whole.range(), t))
        })
        .collect();

    for (span, time) in times {
        if moments.time.is_none() {
            moments.time = Some(time);
        }
        blank(text, span.clone());
        moments.spans.push(span);
    }

    moments
}

/// Copy of `text` with times and dates masked
///
/// `today` supplies the year for dates written without one, so "29/2" is
/// masked exactly when it is a real date this year.
pub fn masked(text: &str, today: NaiveDate) -> String {
    let mut out = text.to_string();
    take_moments(&mut out, today);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 20).unwrap()
    }

    #[test]
    fn test_clock_times() {
        for (input, h, m) in [
            ("ăn phở lúc 12:30 35k", 12, 30),
            ("ăn phở 12h30 35k", 12, 30),
            ("ăn phở 7h 35k", 7, 0),
            ("ăn phở 7 giờ 35k", 7, 0),
            ("ăn phở 7h30p 35k", 7, 30),
        ] {
            let mut text = input.to_string();
            let moments = take_moments(&mut text, today());
            assert_eq!(moments.time, NaiveTime::from_hms_opt(h, m, 0), "{}", input);
            assert!(text.contains("35k"));
            assert_eq!(text.len(), input.len());
        }
    }

    #[test]
    fn test_dates() {
        let mut text = "ăn phở 15/10 35k".to_string();
        let moments = take_moments(&mut text, today());
        assert_eq!(moments.date, NaiveDate::from_ymd_opt(2024, 10, 15));
        assert!(!text.contains("15"));

        let mut text = "đi chợ 1/2/23 200k".to_string();
        let moments = take_moments(&mut text, today());
        assert_eq!(moments.date, NaiveDate::from_ymd_opt(2023, 2, 1));
    }

    #[test]
    fn test_invalid_time_left_alone() {
        let mut text = "phòng 99h".to_string();
        let moments = take_moments(&mut text, today());
        assert!(moments.time.is_none());
        assert_eq!(text, "phòng 99h");
    }

    #[test]
    fn test_hour_word_not_confused_with_item() {
        // "h" followed by letters is part of a word, not a time
        let mut text = "mua 2 hộp sữa 50k".to_string();
        let moments = take_moments(&mut text, today());
        assert!(moments.time.is_none());
    }

    #[test]
    fn test_hour_does_not_swallow_following_amount() {
        let mut text = "ăn phở 7h 35 nghìn".to_string();
        let moments = take_moments(&mut text, today());
        assert_eq!(moments.time, NaiveTime::from_hms_opt(7, 0, 0));
        assert!(text.contains("35 nghìn"));
    }
}
