//! Batched persistence
//!
//! Bound records are written in batches, each transaction spanning
//! `commit_every` batches. A batch that fails on a row is rolled back
//! and replayed row by row so one bad record costs one row, not the
//! batch. Transient store errors are retried with backoff; exhausting
//! the retry policy aborts the run. Dry-run executes the same paths
//! inside transactions that are always rolled back.

use crate::bind::{bind_record, TypedRecord};
use crate::config::ImportConfig;
use crate::entity::EntityKind;
use crate::error::{ImportError, ImportResult};
use crate::retry::{is_transient, with_retry};
use crate::types::{FileReport, ResolvedRow, RowError, RowWarning};
use propd_common::db::{self, UpsertOutcome};
use sqlx::{SqliteConnection, SqlitePool};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How a commit pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitEnd {
    Completed,
    Cancelled,
}

struct PendingRecord {
    record: TypedRecord,
    line: usize,
    expected_update: bool,
}

/// Persist one file's resolved rows, recording outcomes on the report
pub async fn commit_rows(
    pool: &SqlitePool,
    config: &ImportConfig,
    entity: EntityKind,
    rows: Vec<ResolvedRow>,
    cancel: &CancellationToken,
    report: &mut FileReport,
) -> ImportResult<CommitEnd> {
    let mut pending = Vec::with_capacity(rows.len());
    for row in rows {
        match bind_record(entity, &row) {
            Ok(record) => pending.push(PendingRecord {
                record,
                line: row.row.line,
                expected_update: row.expected_update,
            }),
            Err(e) => report.errors.push(e),
        }
    }

    let span = config.batch_size * config.commit_every;
    for chunk in pending.chunks(span) {
        // Cancellation takes effect between transactions; committed work
        // stays committed
        if cancel.is_cancelled() {
            return Ok(CommitEnd::Cancelled);
        }

        match with_retry(&config.retry, || apply_batch(pool, config.dry_run, chunk)).await? {
            BatchResult::Applied(outcomes) => {
                record_outcomes(report, chunk, &outcomes);
            }
            BatchResult::Poisoned => {
                debug!(entity = %entity, rows = chunk.len(), "batch poisoned, replaying row by row");
                replay_rows(pool, config, chunk, report).await?;
            }
        }
    }

    Ok(CommitEnd::Completed)
}

enum BatchResult {
    Applied(Vec<Option<UpsertOutcome>>),
    Poisoned,
}

/// Apply a whole span in one transaction. Any failure rolls the span
/// back; data-level failures hand it back for per-row replay.
async fn apply_batch(
    pool: &SqlitePool,
    dry_run: bool,
    chunk: &[PendingRecord],
) -> propd_common::Result<BatchResult> {
    let mut tx = pool.begin().await?;
    let mut outcomes = Vec::with_capacity(chunk.len());

    for item in chunk {
        match apply_record(&mut *tx, &item.record).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) if is_transient(&e) => {
                tx.rollback().await?;
                return Err(e);
            }
            Err(_) => {
                // A data-level failure (constraint, bad reference): give
                // the batch back for per-row replay
                tx.rollback().await?;
                return Ok(BatchResult::Poisoned);
            }
        }
    }

    if dry_run {
        tx.rollback().await?;
    } else {
        tx.commit().await?;
    }
    Ok(BatchResult::Applied(outcomes))
}

/// Replay a poisoned batch one row per transaction so the failing rows
/// are identified and the rest still commit
async fn replay_rows(
    pool: &SqlitePool,
    config: &ImportConfig,
    chunk: &[PendingRecord],
    report: &mut FileReport,
) -> ImportResult<()> {
    for item in chunk {
        match with_retry(&config.retry, || apply_single(pool, config.dry_run, item)).await {
            Ok(outcome) => {
                record_outcomes(report, std::slice::from_ref(item), &[outcome]);
            }
            Err(ImportError::Common(e)) => {
                report.errors.push(RowError {
                    line: item.line,
                    field: String::new(),
                    rule: "commit".to_string(),
                    message: e.to_string(),
                    raw_value: String::new(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

async fn apply_single(
    pool: &SqlitePool,
    dry_run: bool,
    item: &PendingRecord,
) -> propd_common::Result<Option<UpsertOutcome>> {
    let mut tx = pool.begin().await?;
    let outcome = apply_record(&mut *tx, &item.record).await?;
    if dry_run {
        tx.rollback().await?;
    } else {
        tx.commit().await?;
    }
    Ok(outcome)
}

/// Dispatch one record to its store operation. Maintenance requests are
/// insert-only; everything else upserts by natural key.
async fn apply_record(
    conn: &mut SqliteConnection,
    record: &TypedRecord,
) -> propd_common::Result<Option<UpsertOutcome>> {
    match record {
        TypedRecord::User(user) => db::users::upsert_user(conn, user).await.map(Some),
        TypedRecord::Property(property) => {
            db::properties::upsert_property(conn, property).await.map(Some)
        }
        TypedRecord::Tenant(tenant) => db::tenants::upsert_tenant(conn, tenant).await.map(Some),
        TypedRecord::Lease(lease) => db::leases::upsert_lease(conn, lease).await.map(Some),
        TypedRecord::Maintenance(request) => {
            db::maintenance::insert_request(conn, request).await.map(|_| None)
        }
        TypedRecord::Transaction(tx) => {
            db::transactions::upsert_transaction(conn, tx).await.map(Some)
        }
        TypedRecord::Balance(balance) => {
            db::balances::upsert_balance(conn, balance).await.map(Some)
        }
    }
}

fn record_outcomes(
    report: &mut FileReport,
    chunk: &[PendingRecord],
    outcomes: &[Option<UpsertOutcome>],
) {
    for (item, outcome) in chunk.iter().zip(outcomes) {
        report.committed += 1;
        if let Some(outcome) = outcome {
            if outcome.updated && !item.expected_update {
                report.warnings.push(RowWarning {
                    line: item.line,
                    field: String::new(),
                    message: "existing record matched by natural key, applied as update"
                        .to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CleanedRow, CleanedValue};
    use propd_common::db::init::init_memory_database;
    use propd_common::models::{User, UserRole};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn user_row(line: usize, email: &str, name: &str) -> ResolvedRow {
        let mut fields = BTreeMap::new();
        fields.insert(
            "email".to_string(),
            CleanedValue::Text(email.to_string()),
        );
        fields.insert("name".to_string(), CleanedValue::Text(name.to_string()));
        ResolvedRow {
            row: CleanedRow {
                line,
                fields,
                raw: BTreeMap::new(),
            },
            resolved: BTreeMap::new(),
            expected_update: false,
        }
    }

    #[tokio::test]
    async fn test_commit_inserts_rows() {
        let pool = init_memory_database().await.unwrap();
        let config = ImportConfig::default();
        let cancel = CancellationToken::new();
        let mut report = FileReport::empty("users.csv".to_string(), "users".to_string());

        let rows = vec![
            user_row(1, "a@example.com", "Ann"),
            user_row(2, "b@example.com", "Bob"),
        ];
        let end = commit_rows(&pool, &config, EntityKind::Users, rows, &cancel, &mut report)
            .await
            .unwrap();

        assert_eq!(end, CommitEnd::Completed);
        assert_eq!(report.committed, 2);
        assert!(report.errors.is_empty());
        assert_eq!(db::users::count_users(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_dry_run_counts_but_does_not_write() {
        let pool = init_memory_database().await.unwrap();
        let mut config = ImportConfig::default();
        config.dry_run = true;
        let cancel = CancellationToken::new();
        let mut report = FileReport::empty("users.csv".to_string(), "users".to_string());

        let rows = vec![user_row(1, "a@example.com", "Ann")];
        commit_rows(&pool, &config, EntityKind::Users, rows, &cancel, &mut report)
            .await
            .unwrap();

        assert_eq!(report.committed, 1, "dry-run reports the would-commit count");
        assert_eq!(db::users::count_users(&pool).await.unwrap(), 0);
    }

    fn maintenance_row(line: usize, title: &str, property_id: Uuid) -> ResolvedRow {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), CleanedValue::Text(title.to_string()));
        let mut resolved = BTreeMap::new();
        resolved.insert("property_id".to_string(), property_id);
        ResolvedRow {
            row: CleanedRow {
                line,
                fields,
                raw: BTreeMap::new(),
            },
            resolved,
            expected_update: false,
        }
    }

    #[tokio::test]
    async fn test_poisoned_batch_commits_good_rows() {
        let pool = init_memory_database().await.unwrap();
        let property_id = {
            let mut conn = pool.acquire().await.unwrap();
            let owner = User::new("o@x.y".to_string(), UserRole::Owner, "O".to_string());
            db::users::insert_user(&mut conn, &owner).await.unwrap();
            let p = propd_common::models::Property::new(
                "Maple House".to_string(),
                "12 Maple St".to_string(),
                owner.id,
            );
            db::properties::insert_property(&mut conn, &p).await.unwrap();
            p.id
        };
        let config = ImportConfig::default();
        let cancel = CancellationToken::new();
        let mut report = FileReport::empty("maint.csv".to_string(), "maintenance_requests".to_string());

        // Middle row references a property that does not exist; the FK
        // rejection poisons the batch and replay isolates it
        let rows = vec![
            maintenance_row(1, "Leaky faucet", property_id),
            maintenance_row(2, "Broken gate", Uuid::new_v4()),
            maintenance_row(3, "Loose railing", property_id),
        ];

        let end = commit_rows(
            &pool,
            &config,
            EntityKind::Maintenance,
            rows,
            &cancel,
            &mut report,
        )
        .await
        .unwrap();

        assert_eq!(end, CommitEnd::Completed);
        assert_eq!(report.committed, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].line, 2);
        assert_eq!(report.errors[0].rule, "commit");
        assert_eq!(db::maintenance::count_requests(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_span_rolls_back_every_row() {
        let pool = init_memory_database().await.unwrap();
        let property_id = {
            let mut conn = pool.acquire().await.unwrap();
            let owner = User::new("o@x.y".to_string(), UserRole::Owner, "O".to_string());
            db::users::insert_user(&mut conn, &owner).await.unwrap();
            let p = propd_common::models::Property::new(
                "Maple House".to_string(),
                "12 Maple St".to_string(),
                owner.id,
            );
            db::properties::insert_property(&mut conn, &p).await.unwrap();
            p.id
        };

        // One good row committed inside the same transaction as a bad
        // one must not survive the rollback
        let chunk: Vec<PendingRecord> = [
            maintenance_row(1, "Leaky faucet", property_id),
            maintenance_row(2, "Broken gate", Uuid::new_v4()),
        ]
        .into_iter()
        .map(|row| PendingRecord {
            record: bind_record(EntityKind::Maintenance, &row).unwrap(),
            line: row.row.line,
            expected_update: false,
        })
        .collect();

        let result = apply_batch(&pool, false, &chunk).await.unwrap();
        assert!(matches!(result, BatchResult::Poisoned));
        assert_eq!(db::maintenance::count_requests(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_warning_for_existing_natural_key() {
        let pool = init_memory_database().await.unwrap();
        {
            let mut conn = pool.acquire().await.unwrap();
            let existing = User::new(
                "a@example.com".to_string(),
                UserRole::Owner,
                "Old Name".to_string(),
            );
            db::users::insert_user(&mut conn, &existing).await.unwrap();
        }
        let config = ImportConfig::default();
        let cancel = CancellationToken::new();
        let mut report = FileReport::empty("users.csv".to_string(), "users".to_string());

        let rows = vec![user_row(1, "a@example.com", "New Name")];
        commit_rows(&pool, &config, EntityKind::Users, rows, &cancel, &mut report)
            .await
            .unwrap();

        assert_eq!(report.committed, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].message.contains("applied as update"));
        assert_eq!(db::users::count_users(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_between_batches() {
        let pool = init_memory_database().await.unwrap();
        let mut config = ImportConfig::default();
        config.batch_size = 1;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut report = FileReport::empty("users.csv".to_string(), "users".to_string());

        let rows = vec![user_row(1, "a@example.com", "Ann")];
        let end = commit_rows(&pool, &config, EntityKind::Users, rows, &cancel, &mut report)
            .await
            .unwrap();

        assert_eq!(end, CommitEnd::Cancelled);
        assert_eq!(report.committed, 0);
        assert_eq!(db::users::count_users(&pool).await.unwrap(), 0);
    }
}
