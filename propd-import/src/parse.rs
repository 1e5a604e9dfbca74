//! CSV parsing
//!
//! Reads one input file into a `ParsedFile`. Headers are normalized
//! (lowercased, whitespace collapsed, BOM stripped) so that alias lookup
//! and classification are spelling-tolerant. Ragged rows are recorded as
//! parse errors and skipped, never fatal.

use crate::error::ImportResult;
use crate::types::{ParsedFile, RawRow, RowError};
use std::path::Path;

/// Normalize a header cell for alias matching
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Parse a CSV file from disk
pub fn parse_file(path: &Path) -> ImportResult<ParsedFile> {
    let bytes = std::fs::read(path)?;
    Ok(parse_bytes(&bytes))
}

/// Parse CSV content already in memory
pub fn parse_bytes(bytes: &[u8]) -> ParsedFile {
    let content = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content);

    let headers: Vec<String> = match reader.headers() {
        Ok(record) => record.iter().map(normalize_header).collect(),
        Err(e) => {
            return ParsedFile {
                headers: Vec::new(),
                rows: Vec::new(),
                parse_errors: vec![RowError {
                    line: 0,
                    field: String::new(),
                    rule: "parse".to_string(),
                    message: format!("unreadable header row: {e}"),
                    raw_value: String::new(),
                }],
            }
        }
    };

    let mut rows = Vec::new();
    let mut parse_errors = Vec::new();

    // Data lines are 1-based, header excluded
    for (index, record) in reader.records().enumerate() {
        let line = index + 1;
        match record {
            Ok(record) => {
                if record.len() != headers.len() {
                    parse_errors.push(RowError {
                        line,
                        field: String::new(),
                        rule: "parse".to_string(),
                        message: format!(
                            "row has {} cells, header declares {}",
                            record.len(),
                            headers.len()
                        ),
                        raw_value: record.iter().collect::<Vec<_>>().join(","),
                    });
                    continue;
                }
                rows.push(RawRow {
                    line,
                    cells: record.iter().map(|c| c.to_string()).collect(),
                });
            }
            Err(e) => {
                parse_errors.push(RowError {
                    line,
                    field: String::new(),
                    rule: "parse".to_string(),
                    message: format!("malformed row: {e}"),
                    raw_value: String::new(),
                });
            }
        }
    }

    ParsedFile {
        headers,
        rows,
        parse_errors,
    }
}
