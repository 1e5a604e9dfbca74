//! Postal-code canonicalization
//!
//! US ZIPs are kept as 5 digits or 5+4 with a hyphen. Overlong digit
//! runs are split after the fifth digit; that is a lossy decision and
//! is reported as a truncation warning. Non-numeric codes (e.g.
//! Canadian) are uppercased with a single internal space.

use super::CleanOutcome;
use crate::types::CleanedValue;

pub fn clean_postal(value: &str) -> CleanOutcome {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    // Already-canonical ZIP or ZIP+4
    if is_zip(&compact) {
        return CleanOutcome::ok(CleanedValue::Text(compact));
    }

    if compact.chars().all(|c| c.is_ascii_digit()) {
        if compact.len() > 5 {
            let (zip, extra) = compact.split_at(5);
            return CleanOutcome::with_warning(
                CleanedValue::Text(format!("{zip}-{extra}")),
                format!("postal code '{value}' longer than 5 digits, truncated to ZIP+{}", extra.len()),
            );
        }
        // Short digit runs are kept as typed; validation decides
        return CleanOutcome::ok(CleanedValue::Text(compact));
    }

    // Alphanumeric (Canadian style): uppercase, reinsert the standard
    // space for 6-character codes
    if compact.len() == 6 && compact.chars().all(|c| c.is_ascii_alphanumeric()) {
        let (fsa, ldu) = compact.split_at(3);
        return CleanOutcome::ok(CleanedValue::Text(format!("{fsa} {ldu}")));
    }

    CleanOutcome::ok(CleanedValue::Text(compact))
}

fn is_zip(s: &str) -> bool {
    let bytes = s.as_bytes();
    match bytes.len() {
        5 => bytes.iter().all(|b| b.is_ascii_digit()),
        6..=10 => {
            // 5 digits, hyphen, 1-4 digits
            bytes[..5].iter().all(|b| b.is_ascii_digit())
                && bytes[5] == b'-'
                && bytes[6..].iter().all(|b| b.is_ascii_digit())
                && !bytes[6..].is_empty()
        }
        _ => false,
    }
}
