//! Text normalization and residual extraction

use std::ops::Range;

/// Lowercase and collapse whitespace
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_trim_char(c: char) -> bool {
    c.is_whitespace() || c.is_ascii_punctuation() || matches!(c, '…' | '“' | '”' | '‘' | '’')
}

/// Text left over after removing `spans`, trimmed of punctuation and with
/// whitespace collapsed. Separator-only words are dropped.
pub fn residual(text: &str, spans: &[Range<usize>]) -> String {
    let mut kept = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut sorted: Vec<&Range<usize>> = spans.iter().collect();
    sorted.sort_by_key(|r| r.start);

    for span in sorted {
        if span.start > cursor {
            kept.push_str(&text[cursor..span.start]);
        }
        kept.push(' ');
        cursor = cursor.max(span.end);
    }
    if cursor < text.len() {
        kept.push_str(&text[cursor..]);
    }

    kept.split_whitespace()
        .map(|word| word.trim_matches(is_trim_char))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Trưa   ĂN Phở\t35K "), "trưa ăn phở 35k");
    }

    fn span_of(text: &str, needle: &str) -> Range<usize> {
        let start = text.find(needle).unwrap();
        start..start + needle.len()
    }

    #[test]
    fn test_residual_removes_spans_and_punctuation() {
        let text = "trưa ăn phở, 35k!";
        let spans = vec![
            span_of(text, "trưa"),
            span_of(text, "ăn"),
            span_of(text, "35k"),
        ];
        assert_eq!(residual(text, &spans), "phở");
    }

    #[test]
    fn test_residual_overlapping_spans() {
        let text = "abc def ghi";
        assert_eq!(residual(text, &[0..5, 2..7]), "ghi");
    }

    #[test]
    fn test_residual_empty() {
        assert_eq!(residual(" , ; ", &[]), "");
    }
}
