//! Migration run orchestration
//!
//! One run: list and classify every input file up front, snapshot the
//! store, then push each file through clean, validate, resolve and
//! commit, collecting everything into a [`RunReport`]. Pre-flight
//! failures (missing input, invalid configuration, unclassifiable files)
//! return an error; once processing starts, trouble is recorded in the
//! report and the run ends in `PartiallySucceeded` or `Aborted`.

use crate::classify::detect_entity;
use crate::clean::clean_file;
use crate::commit::{commit_rows, CommitEnd};
use crate::config::ImportConfig;
use crate::entity::EntityKind;
use crate::error::{ImportError, ImportResult};
use crate::parse::parse_file;
use crate::resolve::Resolver;
use crate::snapshot::{prune_snapshots, write_snapshot};
use crate::types::{FileReport, ParsedFile, ResolvedRow, RunReport, RunState, RowWarning};
use crate::validate::validate_file;
use chrono::Utc;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

struct ClassifiedInput {
    file_name: String,
    entity: Option<EntityKind>,
    parsed: ParsedFile,
}

/// Run a full migration over the CSV files in `csv_dir`
pub async fn run_migration(
    pool: &SqlitePool,
    config: &ImportConfig,
    csv_dir: &Path,
    principal: Uuid,
    cancel: &CancellationToken,
) -> ImportResult<RunReport> {
    config.validate()?;
    let started_at = Utc::now();
    let run_id = new_run_id(started_at);
    info!(run_id = %run_id, dir = %csv_dir.display(), dry_run = config.dry_run, "starting migration run");

    let inputs = classify_inputs(csv_dir, config)?;

    if config.snapshot && !config.dry_run {
        write_snapshot(pool, &config.snapshot_dir, &run_id).await?;
        prune_snapshots(&config.snapshot_dir, config.snapshot_retain)?;
    }

    let mut report = RunReport {
        run_id,
        started_at,
        ended_at: started_at,
        state: RunState::Succeeded,
        dry_run: config.dry_run,
        files: Vec::new(),
        abort_reason: None,
    };

    let mut resolver = Resolver::new(pool, principal, config.dry_run, config.retry);
    for input in inputs {
        if cancel.is_cancelled() {
            abort(&mut report, "cancelled");
            break;
        }

        let file_report = match input.entity {
            Some(entity) => {
                match process_file(pool, config, entity, &input, cancel, &mut resolver).await {
                    Ok((file_report, end)) => {
                        if end == CommitEnd::Cancelled {
                            report.files.push(file_report);
                            abort(&mut report, "cancelled");
                            break;
                        }
                        file_report
                    }
                    Err(ImportError::StoreUnavailable(message)) => {
                        report
                            .files
                            .push(FileReport::empty(input.file_name, "unknown".to_string()));
                        abort(&mut report, &format!("store unavailable: {message}"));
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
            None => {
                // Only reachable with skip_unmatched; classification
                // failures are otherwise fatal up front
                let mut file_report =
                    FileReport::empty(input.file_name.clone(), "unrecognized".to_string());
                file_report.warnings.push(RowWarning {
                    line: 0,
                    field: String::new(),
                    message: "file did not match any entity mapping, skipped".to_string(),
                });
                file_report
            }
        };

        report.files.push(file_report);

        let total = report.total_errors();
        if total > config.max_errors {
            abort(
                &mut report,
                &ImportError::TooManyErrors {
                    count: total,
                    threshold: config.max_errors,
                }
                .to_string(),
            );
            break;
        }
    }

    if report.state != RunState::Aborted && report.total_errors() > 0 {
        report.state = RunState::PartiallySucceeded;
    }
    report.ended_at = Utc::now();
    info!(
        run_id = %report.run_id,
        state = ?report.state,
        committed = report.total_committed(),
        errors = report.total_errors(),
        "migration run finished"
    );
    Ok(report)
}

fn abort(report: &mut RunReport, reason: &str) {
    warn!(reason, "aborting migration run");
    report.state = RunState::Aborted;
    report.abort_reason = Some(reason.to_string());
}

/// Timestamp-prefixed run id; ids sort chronologically
fn new_run_id(now: chrono::DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", now.format("%Y%m%dT%H%M%S"), &suffix[..8])
}

/// List, parse and classify every CSV in the directory, sorted by file
/// name for deterministic processing order
fn classify_inputs(csv_dir: &Path, config: &ImportConfig) -> ImportResult<Vec<ClassifiedInput>> {
    if !csv_dir.is_dir() {
        return Err(ImportError::InputNotFound(format!(
            "{} is not a directory",
            csv_dir.display()
        )));
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(csv_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(ImportError::InputNotFound(format!(
            "no CSV files in {}",
            csv_dir.display()
        )));
    }

    let mut inputs = Vec::with_capacity(paths.len());
    for path in paths {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parsed = parse_file(&path)?;
        let entity = detect_entity(&file_name, &parsed.headers, config);

        match entity {
            Some(entity) => {
                info!(file = %file_name, %entity, rows = parsed.rows.len(), "classified input");
            }
            None if config.skip_unmatched => {
                warn!(file = %file_name, "unclassifiable file will be skipped");
            }
            None => return Err(ImportError::UnrecognizedFile(file_name)),
        }

        inputs.push(ClassifiedInput {
            file_name,
            entity,
            parsed,
        });
    }

    Ok(inputs)
}

async fn process_file(
    pool: &SqlitePool,
    config: &ImportConfig,
    entity: EntityKind,
    input: &ClassifiedInput,
    cancel: &CancellationToken,
    resolver: &mut Resolver<'_>,
) -> ImportResult<(FileReport, CommitEnd)> {
    let mapping = config
        .mapping_for(entity)
        .ok_or_else(|| ImportError::ConfigurationInvalid(format!("no mapping for {entity}")))?;

    let mut report = FileReport::empty(input.file_name.clone(), entity.as_str().to_string());
    report.rows_in = input.parsed.rows.len() + input.parsed.parse_errors.len();
    report.errors.extend(input.parsed.parse_errors.clone());

    let (cleaned, clean_warnings) = clean_file(mapping, &input.parsed, config.cleaning);
    report.cleaned = cleaned.len();
    report.warnings.extend(clean_warnings);

    let validated: Vec<_> = if config.validation {
        let outcome = validate_file(mapping, cleaned);
        report.errors.extend(outcome.errors);
        report.warnings.extend(outcome.warnings);
        outcome.rows
    } else {
        cleaned.into_iter().map(|row| (row, false)).collect()
    };
    report.validated = validated.len();

    if report.errors.len() > config.max_errors_per_file {
        warn!(
            file = %input.file_name,
            errors = report.errors.len(),
            "per-file error cap exceeded, file skipped"
        );
        report.warnings.push(RowWarning {
            line: 0,
            field: String::new(),
            message: format!(
                "{} errors exceed the per-file cap of {}, no rows committed",
                report.errors.len(),
                config.max_errors_per_file
            ),
        });
        return Ok((report, CommitEnd::Completed));
    }

    let resolved = resolver.resolve_file(mapping, validated).await?;
    report.errors.extend(resolved.errors);
    report.warnings.extend(resolved.warnings);
    let rows: Vec<ResolvedRow> = resolved.rows;

    let end = commit_rows(pool, config, entity, rows, cancel, &mut report).await?;
    Ok((report, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_sort_chronologically() {
        let early = new_run_id("2026-01-01T00:00:00Z".parse().unwrap());
        let late = new_run_id("2026-06-01T00:00:00Z".parse().unwrap());
        assert!(early < late);
    }
}
