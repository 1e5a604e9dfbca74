//! Shared types and data contracts for the pipeline stages
//!
//! Each stage consumes the previous stage's output type; the contracts
//! here keep the stages independently testable.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A cleaned field value
///
/// Cleaning never fails: it yields one of these variants, with `Null`
/// standing in for empty or unusable input. Validation decides whether a
/// `Null` is acceptable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanedValue {
    Text(String),
    Number(f64),
    Money(f64),
    DateOnly(NaiveDate),
    Bool(bool),
    Null,
}

impl CleanedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CleanedValue::Null)
    }

    /// Borrow the text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CleanedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CleanedValue::Number(n) | CleanedValue::Money(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CleanedValue::DateOnly(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CleanedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Canonical string form, used for re-cleaning (idempotence) and for
    /// duplicate-key comparison
    pub fn display(&self) -> String {
        match self {
            CleanedValue::Text(s) => s.clone(),
            CleanedValue::Number(n) => format_float(*n),
            CleanedValue::Money(n) => format_float(*n),
            CleanedValue::DateOnly(d) => d.to_string(),
            CleanedValue::Bool(b) => b.to_string(),
            CleanedValue::Null => String::new(),
        }
    }
}

fn format_float(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// A parsed input row, cells in original column order
#[derive(Debug, Clone)]
pub struct RawRow {
    /// 1-based data line number (header excluded)
    pub line: usize,
    pub cells: Vec<String>,
}

/// A parsed file: normalized headers plus its rows
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Headers after case-insensitive normalization, original order
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Rows whose cell count did not match the header (skipped, reported)
    pub parse_errors: Vec<RowError>,
}

/// A row after cleaning: canonical field name -> cleaned value
#[derive(Debug, Clone)]
pub struct CleanedRow {
    pub line: usize,
    pub fields: BTreeMap<String, CleanedValue>,
    /// Raw values keyed by canonical field, for error reporting
    pub raw: BTreeMap<String, String>,
}

impl CleanedRow {
    pub fn get(&self, field: &str) -> &CleanedValue {
        self.fields.get(field).unwrap_or(&CleanedValue::Null)
    }

    pub fn raw_value(&self, field: &str) -> String {
        self.raw.get(field).cloned().unwrap_or_default()
    }
}

/// A row after foreign-key resolution
#[derive(Debug, Clone)]
pub struct ResolvedRow {
    pub row: CleanedRow,
    /// Resolved surrogate ids keyed by FK column name (owner_id, ...)
    pub resolved: BTreeMap<String, Uuid>,
    /// True when the row's natural key duplicates an earlier row in the
    /// same file and the commit is expected to apply as an update
    pub expected_update: bool,
}

/// One per-row error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub line: usize,
    pub field: String,
    /// Rule identifier: "required", "regex", "parse", "resolution", ...
    pub rule: String,
    pub message: String,
    pub raw_value: String,
}

/// One per-row warning; warning-only rows still commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowWarning {
    pub line: usize,
    pub field: String,
    pub message: String,
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Succeeded,
    PartiallySucceeded,
    Aborted,
}

/// Per-file section of the run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub file_name: String,
    /// Detected entity, or "unrecognized" when classification was skipped
    pub entity: String,
    pub rows_in: usize,
    pub cleaned: usize,
    pub validated: usize,
    /// Committed rows; under dry-run this is the would-commit count
    pub committed: usize,
    pub errors: Vec<RowError>,
    pub warnings: Vec<RowWarning>,
}

impl FileReport {
    pub fn empty(file_name: String, entity: String) -> Self {
        Self {
            file_name,
            entity,
            rows_in: 0,
            cleaned: 0,
            validated: 0,
            committed: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// The structured record of a single migration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub state: RunState,
    pub dry_run: bool,
    pub files: Vec<FileReport>,
    /// Set when state is Aborted
    pub abort_reason: Option<String>,
}

impl RunReport {
    pub fn total_errors(&self) -> usize {
        self.files.iter().map(|f| f.errors.len()).sum()
    }

    pub fn total_warnings(&self) -> usize {
        self.files.iter().map(|f| f.warnings.len()).sum()
    }

    pub fn total_committed(&self) -> usize {
        self.files.iter().map(|f| f.committed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trips_through_cleaning_shape() {
        assert_eq!(CleanedValue::Text("TX".to_string()).display(), "TX");
        assert_eq!(CleanedValue::Money(1800.0).display(), "1800");
        assert_eq!(CleanedValue::Money(1800.5).display(), "1800.5");
        assert_eq!(
            CleanedValue::DateOnly(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()).display(),
            "2026-01-15"
        );
        assert_eq!(CleanedValue::Null.display(), "");
    }
}
