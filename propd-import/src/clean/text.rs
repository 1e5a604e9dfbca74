//! Base text normalization

use unicode_normalization::UnicodeNormalization;

/// Trim, collapse whitespace runs to a single space, NFC normalize
pub fn normalize_text(raw: &str) -> String {
    raw.nfc()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase snake token: "In Progress" -> "in_progress"
pub fn to_token(value: &str) -> String {
    value
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Title-case each word: "fort worth" -> "Fort Worth"
pub fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(normalize_text("  a \t b\n c  "), "a b c");
    }

    #[test]
    fn test_token() {
        assert_eq!(to_token("In Progress"), "in_progress");
        assert_eq!(to_token("Month-to-Month"), "month_to_month");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("fort worth"), "Fort Worth");
        assert_eq!(title_case("AUSTIN"), "Austin");
    }
}
