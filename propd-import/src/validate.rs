//! Row validation
//!
//! Rules are declarative per-field checks attached to an entity mapping.
//! A rule failure records a `RowError` and keeps the row out of the
//! commit set; warnings (in-file duplicate keys, lossy cleanings) do not
//! block the row.

use crate::config::EntityMapping;
use crate::types::{CleanedRow, CleanedValue, RowError, RowWarning};
use chrono::{NaiveDate, Utc};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]+$";

/// One validation check bound to a canonical field
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: String,
    pub rule: RuleKind,
}

impl FieldRule {
    pub fn new(field: &str, rule: RuleKind) -> Self {
        Self {
            field: field.to_string(),
            rule,
        }
    }
}

/// The available check kinds
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// Value must be present and non-empty
    Required,
    /// Text value must match the pattern
    Regex(String),
    /// Value must be a parseable calendar date
    DateFormat,
    /// Numeric value must fit precision/scale
    Decimal { precision: u32, scale: u32 },
    /// Numeric value must fall inside the closed interval
    Range { min: Option<f64>, max: Option<f64> },
    /// Text value must be one of the listed tokens
    OneOf(Vec<String>),
    /// Numeric value must not be zero
    NonZero,
    /// Date must not be later than today
    NotFuture,
}

impl RuleKind {
    pub fn email_regex() -> Self {
        RuleKind::Regex(EMAIL_PATTERN.to_string())
    }

    /// Short identifier used in error records
    fn name(&self) -> &'static str {
        match self {
            RuleKind::Required => "required",
            RuleKind::Regex(_) => "regex",
            RuleKind::DateFormat => "date_format",
            RuleKind::Decimal { .. } => "decimal",
            RuleKind::Range { .. } => "range",
            RuleKind::OneOf(_) => "one_of",
            RuleKind::NonZero => "non_zero",
            RuleKind::NotFuture => "not_future",
        }
    }
}

/// Outcome of validating one file's cleaned rows
#[derive(Debug, Default)]
pub struct ValidatedFile {
    /// Rows that passed; the flag marks in-file natural-key duplicates
    /// expected to apply as updates
    pub rows: Vec<(CleanedRow, bool)>,
    pub errors: Vec<RowError>,
    pub warnings: Vec<RowWarning>,
}

/// Validate a file's rows against the mapping's rules.
///
/// Also detects natural-key duplicates within the file: later rows with
/// a key already seen are kept (last-wins via upsert) but flagged and
/// warned about.
pub fn validate_file(mapping: &EntityMapping, rows: Vec<CleanedRow>) -> ValidatedFile {
    let today = Utc::now().date_naive();
    let patterns = compile_patterns(mapping);
    let key_fields = mapping.entity.file_natural_key();

    let mut out = ValidatedFile::default();
    let mut seen_keys: HashSet<String> = HashSet::new();

    for row in rows {
        let mut row_errors = Vec::new();

        for rule in &mapping.rules {
            if let Some(message) = check_rule(&rule.rule, row.get(&rule.field), today, &patterns) {
                row_errors.push(RowError {
                    line: row.line,
                    field: rule.field.clone(),
                    rule: rule.rule.name().to_string(),
                    message,
                    raw_value: row.raw_value(&rule.field),
                });
            }
        }

        row_errors.extend(cross_field_errors(mapping, &row));

        if !row_errors.is_empty() {
            out.errors.append(&mut row_errors);
            continue;
        }

        let expected_update = match file_key(&row, key_fields) {
            Some(key) if !seen_keys.insert(key.clone()) => {
                out.warnings.push(RowWarning {
                    line: row.line,
                    field: key_fields.join("+"),
                    message: "duplicate key within file, applied as update".to_string(),
                });
                true
            }
            _ => false,
        };

        out.rows.push((row, expected_update));
    }

    out
}

fn compile_patterns(mapping: &EntityMapping) -> BTreeMap<String, Regex> {
    let mut patterns = BTreeMap::new();
    for rule in &mapping.rules {
        if let RuleKind::Regex(pattern) = &rule.rule {
            if !patterns.contains_key(pattern) {
                if let Ok(re) = Regex::new(pattern) {
                    patterns.insert(pattern.clone(), re);
                }
            }
        }
    }
    patterns
}

/// Build the in-file duplicate-detection key; None when any key field is
/// null (partial keys never collide)
fn file_key(row: &CleanedRow, key_fields: &[&str]) -> Option<String> {
    if key_fields.is_empty() {
        return None;
    }
    let mut parts = Vec::with_capacity(key_fields.len());
    for field in key_fields {
        let value = row.get(field);
        if value.is_null() {
            return None;
        }
        parts.push(value.display().to_lowercase());
    }
    Some(parts.join("\u{1f}"))
}

/// Evaluate one rule; Some(message) on failure.
///
/// All rules other than Required treat Null as passing: absence is
/// Required's concern alone.
fn check_rule(
    rule: &RuleKind,
    value: &CleanedValue,
    today: NaiveDate,
    patterns: &BTreeMap<String, Regex>,
) -> Option<String> {
    if value.is_null() {
        return match rule {
            RuleKind::Required => Some("value is required".to_string()),
            _ => None,
        };
    }

    match rule {
        RuleKind::Required => None,
        RuleKind::Regex(pattern) => {
            let text = value.display();
            let matched = patterns
                .get(pattern)
                .map(|re| re.is_match(&text))
                .unwrap_or(false);
            if matched {
                None
            } else {
                Some(format!("'{text}' does not match the expected format"))
            }
        }
        RuleKind::DateFormat => match value {
            CleanedValue::DateOnly(_) => None,
            // Cleaning disabled: accept raw text that still parses
            CleanedValue::Text(s) => {
                match crate::clean::date::clean_date(s).value {
                    CleanedValue::DateOnly(_) => None,
                    _ => Some(format!("'{s}' is not a recognizable date")),
                }
            }
            other => Some(format!("'{}' is not a date", other.display())),
        },
        RuleKind::Decimal { precision, scale } => {
            let n = match value.as_number() {
                Some(n) => n,
                None => return Some(format!("'{}' is not numeric", value.display())),
            };
            let scaled = format!("{n:.prec$}", prec = *scale as usize);
            let digits = scaled.chars().filter(|c| c.is_ascii_digit()).count() as u32;
            let rounded: f64 = match scaled.parse() {
                Ok(r) => r,
                Err(_) => return Some(format!("'{}' is not numeric", value.display())),
            };
            if (rounded - n).abs() > f64::EPSILON * n.abs().max(1.0) {
                Some(format!("'{n}' has more than {scale} decimal places"))
            } else if digits > *precision {
                Some(format!("'{n}' exceeds {precision} total digits"))
            } else {
                None
            }
        }
        RuleKind::Range { min, max } => {
            let n = match value.as_number() {
                Some(n) => n,
                None => return Some(format!("'{}' is not numeric", value.display())),
            };
            if let Some(lo) = min {
                if n < *lo {
                    return Some(format!("{n} is below the minimum {lo}"));
                }
            }
            if let Some(hi) = max {
                if n > *hi {
                    return Some(format!("{n} is above the maximum {hi}"));
                }
            }
            None
        }
        RuleKind::OneOf(allowed) => {
            let text = value.display();
            if allowed.iter().any(|a| a == &text) {
                None
            } else {
                Some(format!(
                    "'{text}' is not one of: {}",
                    allowed.join(", ")
                ))
            }
        }
        RuleKind::NonZero => match value.as_number() {
            Some(n) if n == 0.0 => Some("amount must not be zero".to_string()),
            Some(_) => None,
            None => Some(format!("'{}' is not numeric", value.display())),
        },
        RuleKind::NotFuture => match value.as_date() {
            Some(d) if d > today => Some(format!("date {d} is in the future")),
            _ => None,
        },
    }
}

/// Checks that relate two fields of the same row
fn cross_field_errors(mapping: &EntityMapping, row: &CleanedRow) -> Vec<RowError> {
    use crate::entity::EntityKind;

    let mut errors = Vec::new();
    let mut ordered = |start_field: &str, end_field: &str, errors: &mut Vec<RowError>| {
        if let (Some(start), Some(end)) = (row.get(start_field).as_date(), row.get(end_field).as_date()) {
            if start > end {
                errors.push(RowError {
                    line: row.line,
                    field: end_field.to_string(),
                    rule: "cross_field".to_string(),
                    message: format!("{end_field} {end} precedes {start_field} {start}"),
                    raw_value: row.raw_value(end_field),
                });
            }
        }
    };

    match mapping.entity {
        EntityKind::Tenants => ordered("lease_start", "lease_end", &mut errors),
        EntityKind::Leases => ordered("start_date", "end_date", &mut errors),
        EntityKind::Maintenance => {
            let status = row.get("status").display();
            let has_completion = !row.get("completion_date").is_null();
            if status == "completed" && !has_completion {
                errors.push(RowError {
                    line: row.line,
                    field: "completion_date".to_string(),
                    rule: "cross_field".to_string(),
                    message: "completed requests need a completion date".to_string(),
                    raw_value: row.raw_value("completion_date"),
                });
            }
            if status != "completed" && !status.is_empty() && has_completion {
                errors.push(RowError {
                    line: row.line,
                    field: "completion_date".to_string(),
                    rule: "cross_field".to_string(),
                    message: format!("completion date set but status is '{status}'"),
                    raw_value: row.raw_value("completion_date"),
                });
            }
        }
        _ => {}
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_mappings;
    use crate::entity::EntityKind;
    use std::collections::BTreeMap;

    fn mapping(entity: EntityKind) -> EntityMapping {
        default_mappings()
            .into_iter()
            .find(|m| m.entity == entity)
            .unwrap()
    }

    fn row(line: usize, fields: &[(&str, CleanedValue)]) -> CleanedRow {
        let mut map = BTreeMap::new();
        let mut raw = BTreeMap::new();
        for (field, value) in fields {
            raw.insert(field.to_string(), value.display());
            map.insert(field.to_string(), value.clone());
        }
        CleanedRow {
            line,
            fields: map,
            raw,
        }
    }

    fn text(s: &str) -> CleanedValue {
        CleanedValue::Text(s.to_string())
    }

    #[test]
    fn test_required_and_email() {
        let m = mapping(EntityKind::Users);
        let rows = vec![
            row(1, &[("email", text("a@example.com")), ("name", text("Ann"))]),
            row(2, &[("email", CleanedValue::Null), ("name", text("Bob"))]),
            row(3, &[("email", text("not-an-email")), ("name", text("Cy"))]),
        ];
        let out = validate_file(&m, rows);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.errors.len(), 2);
        assert_eq!(out.errors[0].rule, "required");
        assert_eq!(out.errors[1].rule, "regex");
    }

    #[test]
    fn test_duplicate_key_flags_update() {
        let m = mapping(EntityKind::Users);
        let rows = vec![
            row(1, &[("email", text("a@example.com")), ("name", text("Ann"))]),
            row(2, &[("email", text("a@example.com")), ("name", text("Ann B"))]),
        ];
        let out = validate_file(&m, rows);
        assert_eq!(out.rows.len(), 2);
        assert!(!out.rows[0].1);
        assert!(out.rows[1].1, "second occurrence applies as update");
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].message.contains("duplicate key"));
    }

    #[test]
    fn test_non_zero_amount() {
        let m = mapping(EntityKind::Transactions);
        let rows = vec![row(
            1,
            &[
                ("property_title", text("Maple House")),
                (
                    "transaction_date",
                    CleanedValue::DateOnly(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
                ),
                ("transaction_type", text("rent_payment")),
                ("amount", CleanedValue::Money(0.0)),
            ],
        )];
        let out = validate_file(&m, rows);
        assert_eq!(out.rows.len(), 0);
        assert_eq!(out.errors[0].rule, "non_zero");
    }

    #[test]
    fn test_lease_dates_ordered() {
        let m = mapping(EntityKind::Leases);
        let rows = vec![row(
            4,
            &[
                ("tenant_email", text("t@example.com")),
                ("property_title", text("Maple House")),
                (
                    "start_date",
                    CleanedValue::DateOnly(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
                ),
                (
                    "end_date",
                    CleanedValue::DateOnly(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
                ),
            ],
        )];
        let out = validate_file(&m, rows);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].rule, "cross_field");
        assert_eq!(out.errors[0].line, 4);
    }

    #[test]
    fn test_completed_needs_completion_date() {
        let m = mapping(EntityKind::Maintenance);
        let rows = vec![row(
            2,
            &[
                ("property_title", text("Maple House")),
                ("title", text("Leaky faucet")),
                ("status", text("completed")),
            ],
        )];
        let out = validate_file(&m, rows);
        assert_eq!(out.errors.len(), 1);
        assert!(out.errors[0].message.contains("completion date"));
    }

    #[test]
    fn test_decimal_scale() {
        let m = mapping(EntityKind::Properties);
        let rows = vec![row(
            1,
            &[
                ("title", text("Maple House")),
                ("address_line1", text("12 Maple St")),
                ("rent", CleanedValue::Money(1800.123)),
            ],
        )];
        let out = validate_file(&m, rows);
        assert!(out.errors.iter().any(|e| e.rule == "decimal"));
    }

    #[test]
    fn test_future_transaction_date_rejected() {
        let m = mapping(EntityKind::Transactions);
        let future = Utc::now().date_naive() + chrono::Days::new(30);
        let rows = vec![row(
            1,
            &[
                ("property_title", text("Maple House")),
                ("transaction_date", CleanedValue::DateOnly(future)),
                ("transaction_type", text("rent_payment")),
                ("amount", CleanedValue::Money(100.0)),
            ],
        )];
        let out = validate_file(&m, rows);
        assert!(out.errors.iter().any(|e| e.rule == "not_future"));
    }
}
