//! Phone number canonicalization
//!
//! Output form is "+" followed by country code and national digits, no
//! punctuation. Ten-digit numbers are assumed NANP and get "+1".

use super::CleanOutcome;
use crate::types::CleanedValue;

pub fn clean_phone(value: &str) -> CleanOutcome {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        10 => CleanOutcome::ok(CleanedValue::Text(format!("+1{digits}"))),
        11 if digits.starts_with('1') => {
            CleanOutcome::ok(CleanedValue::Text(format!("+{digits}")))
        }
        8..=15 if value.starts_with('+') => {
            CleanOutcome::ok(CleanedValue::Text(format!("+{digits}")))
        }
        0 => CleanOutcome::with_warning(
            CleanedValue::Null,
            format!("no digits in phone value '{value}'"),
        ),
        _ => CleanOutcome::with_warning(
            CleanedValue::Text(digits.clone()),
            format!("unrecognized phone format '{value}', kept digits only"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nanp_formats() {
        for raw in ["(512) 555-1234", "512-555-1234", "512.555.1234", "5125551234"] {
            assert_eq!(
                clean_phone(raw).value,
                CleanedValue::Text("+15125551234".to_string()),
                "failed for {raw}"
            );
        }
        assert_eq!(
            clean_phone("1-512-555-1234").value,
            CleanedValue::Text("+15125551234".to_string())
        );
    }

    #[test]
    fn test_international_keeps_country_code() {
        assert_eq!(
            clean_phone("+44 20 7946 0958").value,
            CleanedValue::Text("+442079460958".to_string())
        );
    }

    #[test]
    fn test_odd_lengths_warn() {
        let out = clean_phone("555-1234");
        assert!(out.warning.is_some());
        assert_eq!(out.value, CleanedValue::Text("5551234".to_string()));
    }
}
