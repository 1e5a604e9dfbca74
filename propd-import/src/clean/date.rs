//! Multi-format date parsing
//!
//! Accepted forms, tried in order: ISO (2026-01-15), US (01/15/2026),
//! EU (15/01/2026, only when the US reading is impossible), dotted EU,
//! and textual months (January 15, 2026 / 15 January 2026 / Jan 15, 2026).

use super::CleanOutcome;
use crate::types::CleanedValue;
use chrono::NaiveDate;

const FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

pub fn clean_date(value: &str) -> CleanOutcome {
    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return CleanOutcome::ok(CleanedValue::DateOnly(date));
        }
    }

    CleanOutcome::with_warning(
        CleanedValue::Null,
        format!("unparseable date '{value}'"),
    )
}
