//! Field cleaning
//!
//! Cleaning transforms one raw cell into a [`CleanedValue`]. It never
//! fails: unusable input becomes `Null`, and any decision that loses
//! information is surfaced as a warning for the report. Every cleaner is
//! idempotent: cleaning the display form of its own output is a no-op.

pub mod address;
pub mod date;
pub mod money;
pub mod phone;
pub mod postal;
pub mod text;

use crate::config::EntityMapping;
use crate::types::{CleanedRow, CleanedValue, ParsedFile, RowWarning};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Cleaning function selector, assigned per canonical field in the
/// configuration bundle
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanerKind {
    /// Trim, collapse whitespace, NFC normalize
    Text,
    /// Lowercase snake token (statuses, categories, roles)
    Token,
    /// Lowercased email address
    Email,
    /// Digit-only canonical phone with country prefix
    Phone,
    /// Street address with standardized abbreviations
    Address,
    /// City name, title-cased
    City,
    /// Two-letter state/province code
    State,
    /// Canonical postal code
    Postal,
    /// Currency amount with symbols and separators stripped
    Money,
    /// Plain numeric value
    Number,
    /// Multi-format calendar date
    Date,
    /// Building type mapped onto the canonical vocabulary
    BuildingType,
    /// Lease type mapped onto the canonical vocabulary
    LeaseType,
    /// Boolean flag (yes/no, true/false, 1/0)
    Flag,
}

/// Result of cleaning a single cell
#[derive(Debug, Clone, PartialEq)]
pub struct CleanOutcome {
    pub value: CleanedValue,
    pub warning: Option<String>,
}

impl CleanOutcome {
    pub fn ok(value: CleanedValue) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    pub fn with_warning(value: CleanedValue, warning: impl Into<String>) -> Self {
        Self {
            value,
            warning: Some(warning.into()),
        }
    }
}

/// Clean one raw cell with the given cleaner
pub fn clean_field(kind: &CleanerKind, raw: &str) -> CleanOutcome {
    // Common base: trim, collapse whitespace runs, NFC
    let base = text::normalize_text(raw);
    if base.is_empty() {
        return CleanOutcome::ok(CleanedValue::Null);
    }

    match kind {
        CleanerKind::Text => CleanOutcome::ok(CleanedValue::Text(base)),
        CleanerKind::Token => CleanOutcome::ok(CleanedValue::Text(text::to_token(&base))),
        CleanerKind::Email => CleanOutcome::ok(CleanedValue::Text(base.to_lowercase())),
        CleanerKind::Phone => phone::clean_phone(&base),
        CleanerKind::Address => CleanOutcome::ok(CleanedValue::Text(address::standardize_address(
            &base,
        ))),
        CleanerKind::City => CleanOutcome::ok(CleanedValue::Text(text::title_case(&base))),
        CleanerKind::State => CleanOutcome::ok(CleanedValue::Text(address::standardize_state(
            &base,
        ))),
        CleanerKind::Postal => postal::clean_postal(&base),
        CleanerKind::Money => money::clean_money(&base),
        CleanerKind::Number => money::clean_number(&base),
        CleanerKind::Date => date::clean_date(&base),
        CleanerKind::BuildingType => {
            CleanOutcome::ok(CleanedValue::Text(address::map_building_type(&base)))
        }
        CleanerKind::LeaseType => CleanOutcome::ok(CleanedValue::Text(map_lease_type(&base))),
        CleanerKind::Flag => clean_flag(&base),
    }
}

/// Clean a parsed file into canonical rows.
///
/// Headers that map to no canonical field are ignored. With cleaning
/// disabled, normalizing cleaners are skipped and cells pass through as
/// text; typed cleaners (dates, amounts, flags) still run, since later
/// stages need typed values.
pub fn clean_file(
    mapping: &EntityMapping,
    parsed: &ParsedFile,
    cleaning: bool,
) -> (Vec<CleanedRow>, Vec<RowWarning>) {
    let canonical: Vec<Option<&str>> = parsed
        .headers
        .iter()
        .map(|h| mapping.canonical_field(h))
        .collect();

    let mut rows = Vec::with_capacity(parsed.rows.len());
    let mut warnings = Vec::new();

    for raw_row in &parsed.rows {
        let mut fields = BTreeMap::new();
        let mut raw = BTreeMap::new();

        for (cell, field) in raw_row.cells.iter().zip(&canonical) {
            let Some(field) = field else { continue };

            let kind = mapping
                .cleaners
                .get(*field)
                .cloned()
                .unwrap_or(CleanerKind::Text);
            let outcome = if cleaning || is_typed(&kind) {
                clean_field(&kind, cell)
            } else {
                clean_field(&CleanerKind::Text, cell)
            };

            if let Some(message) = outcome.warning {
                warnings.push(RowWarning {
                    line: raw_row.line,
                    field: field.to_string(),
                    message,
                });
            }
            raw.insert(field.to_string(), cell.clone());
            fields.insert(field.to_string(), outcome.value);
        }

        rows.push(CleanedRow {
            line: raw_row.line,
            fields,
            raw,
        });
    }

    (rows, warnings)
}

/// Cleaners whose output type later stages depend on
fn is_typed(kind: &CleanerKind) -> bool {
    matches!(
        kind,
        CleanerKind::Money | CleanerKind::Number | CleanerKind::Date | CleanerKind::Flag
    )
}

fn map_lease_type(value: &str) -> String {
    let token = text::to_token(value);
    match token.as_str() {
        "month_to_month" | "mtm" | "monthly" => "month_to_month".to_string(),
        "fixed" | "fixed_term" => "fixed_term".to_string(),
        "fixed_with_rollover" | "rollover" | "fixed_rollover" => "fixed_with_rollover".to_string(),
        _ => token,
    }
}

fn clean_flag(value: &str) -> CleanOutcome {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => CleanOutcome::ok(CleanedValue::Bool(true)),
        "false" | "no" | "n" | "0" | "" => CleanOutcome::ok(CleanedValue::Bool(false)),
        other => CleanOutcome::with_warning(
            CleanedValue::Null,
            format!("unrecognized flag value '{other}'"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every cleaner must be idempotent: re-cleaning the display form of
    /// its output yields the same value.
    #[test]
    fn test_cleaning_is_idempotent() {
        let samples: Vec<(CleanerKind, &str)> = vec![
            (CleanerKind::Text, "  Maple   12  "),
            (CleanerKind::Token, "In Progress"),
            (CleanerKind::Email, "Jane.Q@Example.COM"),
            (CleanerKind::Phone, "(512) 555-1234"),
            (CleanerKind::Address, "12 Maple Street"),
            (CleanerKind::City, "austin"),
            (CleanerKind::State, "texas"),
            (CleanerKind::Postal, "787015"),
            (CleanerKind::Money, "$1,800.00"),
            (CleanerKind::Number, "42"),
            (CleanerKind::Date, "01/15/2026"),
            (CleanerKind::BuildingType, "Apartment"),
            (CleanerKind::LeaseType, "Month-to-Month"),
            (CleanerKind::Flag, "Yes"),
        ];

        for (kind, raw) in samples {
            let once = clean_field(&kind, raw);
            let twice = clean_field(&kind, &once.value.display());
            assert_eq!(
                once.value, twice.value,
                "{kind:?} not idempotent for {raw:?}"
            );
        }
    }

    #[test]
    fn test_empty_input_is_null() {
        for kind in [CleanerKind::Text, CleanerKind::Money, CleanerKind::Date] {
            assert_eq!(clean_field(&kind, "   ").value, CleanedValue::Null);
        }
    }

    #[test]
    fn test_clean_file_maps_aliases_and_warns() {
        let config = crate::config::ImportConfig::default();
        let mapping = config
            .mapping_for(crate::entity::EntityKind::Properties)
            .unwrap();
        let parsed = crate::parse::parse_bytes(
            b"Property Name,Address 1,State/Province,Postal Code,Monthly Rent\n\
              Maple House,12 Maple Street,texas,787015,\"$1,800.00\"\n",
        );

        let (rows, warnings) = clean_file(mapping, &parsed, true);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.get("title").display(), "Maple House");
        assert_eq!(row.get("address_line1").display(), "12 Maple St");
        assert_eq!(row.get("state").display(), "TX");
        assert_eq!(row.get("postal_code").display(), "78701-5");
        assert_eq!(row.get("rent"), &CleanedValue::Money(1800.0));
        assert_eq!(row.raw_value("rent"), "$1,800.00");
        // The lossy postal split is the only warning
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "postal_code");
    }

    #[test]
    fn test_lease_type_mapping() {
        assert_eq!(
            clean_field(&CleanerKind::LeaseType, "Month-to-Month").value,
            CleanedValue::Text("month_to_month".to_string())
        );
        assert_eq!(
            clean_field(&CleanerKind::LeaseType, "Fixed Term").value,
            CleanedValue::Text("fixed_term".to_string())
        );
    }
}
