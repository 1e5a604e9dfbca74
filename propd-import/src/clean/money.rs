//! Currency and numeric cleaning

use super::CleanOutcome;
use crate::types::CleanedValue;

/// Clean a currency amount: strip symbols and thousands separators,
/// accept accounting-style parentheses for negatives.
pub fn clean_money(value: &str) -> CleanOutcome {
    let mut s = value.trim().to_string();

    let negative_parens = s.starts_with('(') && s.ends_with(')');
    if negative_parens {
        s = s[1..s.len() - 1].to_string();
    }

    let stripped: String = s
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | ' ' | '\u{a0}'))
        .collect();

    match stripped.parse::<f64>() {
        Ok(mut amount) => {
            if negative_parens {
                amount = -amount;
            }
            CleanOutcome::ok(CleanedValue::Money(amount))
        }
        Err(_) => CleanOutcome::with_warning(
            CleanedValue::Null,
            format!("unparseable amount '{value}'"),
        ),
    }
}

/// Clean a plain numeric value
pub fn clean_number(value: &str) -> CleanOutcome {
    let stripped: String = value.chars().filter(|c| *c != ',').collect();
    match stripped.trim().parse::<f64>() {
        Ok(n) => CleanOutcome::ok(CleanedValue::Number(n)),
        Err(_) => CleanOutcome::with_warning(
            CleanedValue::Null,
            format!("unparseable number '{value}'"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_and_separators() {
        assert_eq!(clean_money("$1,800.00").value, CleanedValue::Money(1800.0));
        assert_eq!(clean_money("€950").value, CleanedValue::Money(950.0));
        assert_eq!(clean_money("1800").value, CleanedValue::Money(1800.0));
    }

    #[test]
    fn test_accounting_negative() {
        assert_eq!(clean_money("($250.00)").value, CleanedValue::Money(-250.0));
        assert_eq!(clean_money("-250").value, CleanedValue::Money(-250.0));
    }

    #[test]
    fn test_garbage_is_null_with_warning() {
        let out = clean_money("n/a");
        assert_eq!(out.value, CleanedValue::Null);
        assert!(out.warning.is_some());
    }
}
