//! Delete intent extraction

use chrono::NaiveDate;

use super::keywords::{self, Role};
use super::price::extract_price;
use super::text::residual;
use super::when;
use crate::models::DeleteIntent;

/// Extract which transaction to delete from normalized text
///
/// Whatever remains after dropping the delete words, fillers, the first verb,
/// a meal word and a price becomes the query. Nothing left means "most
/// recent". Never fails.
pub fn extract_delete(text: &str, today: NaiveDate) -> DeleteIntent {
    let masked = when::masked(text, today);
    let hits = keywords::scan(&masked);
    let mut removed = Vec::new();

    let price = extract_price(&masked).and_then(|p| {
        removed.push(p.span.clone());
        (p.value > 0).then_some(p.value)
    });

    let meal_time = keywords::first(&hits, |r| matches!(r, Role::Meal(_))).and_then(|hit| {
        removed.push(hit.start..hit.end);
        match hit.role {
            Role::Meal(meal) => Some(meal),
            _ => None,
        }
    });

    if let Some(verb) = keywords::first(&hits, |r| matches!(r, Role::Verb)) {
        removed.push(verb.start..verb.end);
    }
    removed.extend(
        hits.iter()
            .filter(|h| matches!(h.role, Role::Delete | Role::Filler | Role::RelativeDay(_)))
            .map(|h| h.start..h.end),
    );

    let query = residual(&masked, &removed);
    DeleteIntent {
        query: (!query.is_empty()).then_some(query),
        price,
        meal_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MealTime;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 20).unwrap()
    }

    #[test]
    fn test_delete_by_item() {
        assert_eq!(extract_delete("xóa phở", today()), DeleteIntent::matching("phở"));
        assert_eq!(extract_delete("xoá bỏ trà sữa", today()), DeleteIntent::matching("trà sữa"));
    }

    #[test]
    fn test_delete_most_recent() {
        assert_eq!(extract_delete("", today()), DeleteIntent::most_recent());
        assert_eq!(extract_delete("xóa", today()), DeleteIntent::most_recent());
        assert_eq!(extract_delete("xóa giao dịch gần nhất", today()), DeleteIntent::most_recent());
        assert!(extract_delete("gần nhất", today()).is_most_recent());
    }

    #[test]
    fn test_delete_with_filters() {
        let intent = extract_delete("xóa trưa ăn phở 35k", today());
        assert_eq!(intent.query.as_deref(), Some("phở"));
        assert_eq!(intent.price, Some(35_000));
        assert_eq!(intent.meal_time, Some(MealTime::Noon));
    }

    #[test]
    fn test_zero_price_is_not_a_filter() {
        let intent = extract_delete("xóa phở 0k", today());
        assert_eq!(intent.query.as_deref(), Some("phở"));
        assert_eq!(intent.price, None);
    }
}
