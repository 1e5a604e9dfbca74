//! Run report rendering
//!
//! The structured [`RunReport`] renders to human-readable text, JSON for
//! tooling, or CSV with one line per file.

use crate::error::{ImportError, ImportResult};
use crate::types::{RunReport, RunState};
use clap::ValueEnum;
use std::fmt::Write as _;

/// Output format for the run report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// Render a run report in the requested format
pub fn render(report: &RunReport, format: OutputFormat) -> ImportResult<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => serde_json::to_string_pretty(report)
            .map_err(|e| ImportError::Common(propd_common::Error::Internal(e.to_string()))),
        OutputFormat::Csv => render_csv(report),
    }
}

fn state_label(state: RunState) -> &'static str {
    match state {
        RunState::Succeeded => "succeeded",
        RunState::PartiallySucceeded => "partially succeeded",
        RunState::Aborted => "aborted",
    }
}

fn render_text(report: &RunReport) -> String {
    let commit_label = if report.dry_run { "would commit" } else { "committed" };
    let mut out = String::new();

    let _ = writeln!(out, "Migration run {}", report.run_id);
    let _ = writeln!(
        out,
        "  state: {}{}",
        state_label(report.state),
        if report.dry_run { " (dry run)" } else { "" }
    );
    if let Some(reason) = &report.abort_reason {
        let _ = writeln!(out, "  abort reason: {reason}");
    }
    let _ = writeln!(
        out,
        "  files: {}  {commit_label}: {}  errors: {}  warnings: {}",
        report.files.len(),
        report.total_committed(),
        report.total_errors(),
        report.total_warnings(),
    );

    for file in &report.files {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} [{}]: {} rows in, {} cleaned, {} validated, {} {commit_label}",
            file.file_name, file.entity, file.rows_in, file.cleaned, file.validated, file.committed,
        );
        for error in &file.errors {
            let _ = writeln!(
                out,
                "  error line {} {} ({}): {}",
                error.line, error.field, error.rule, error.message
            );
        }
        for warning in &file.warnings {
            let _ = writeln!(
                out,
                "  warning line {} {}: {}",
                warning.line, warning.field, warning.message
            );
        }
    }

    out
}

fn render_csv(report: &RunReport) -> ImportResult<String> {
    let commit_header = if report.dry_run { "would_commit" } else { "committed" };
    let mut writer = csv::Writer::from_writer(Vec::new());
    let map_err = |e: csv::Error| {
        ImportError::Common(propd_common::Error::Internal(format!("report csv: {e}")))
    };

    writer
        .write_record([
            "file_name",
            "entity",
            "rows_in",
            "cleaned",
            "validated",
            commit_header,
            "errors",
            "warnings",
        ])
        .map_err(map_err)?;
    for file in &report.files {
        writer
            .write_record([
                file.file_name.as_str(),
                file.entity.as_str(),
                &file.rows_in.to_string(),
                &file.cleaned.to_string(),
                &file.validated.to_string(),
                &file.committed.to_string(),
                &file.errors.len().to_string(),
                &file.warnings.len().to_string(),
            ])
            .map_err(map_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ImportError::Common(propd_common::Error::Internal(format!("report csv: {e}"))))?;
    String::from_utf8(bytes)
        .map_err(|e| ImportError::Common(propd_common::Error::Internal(e.to_string())))
}
