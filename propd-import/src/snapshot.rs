//! Pre-run database snapshots
//!
//! Before a run mutates the store, every entity table is dumped to CSV
//! under a per-run directory, with a manifest carrying row counts and
//! SHA-256 digests. The snapshot is written to a temporary directory and
//! renamed into place so a crashed run never leaves a half snapshot
//! behind. Old snapshots beyond the retention count are pruned.

use crate::entity::EntityKind;
use crate::error::ImportResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqlitePool};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Manifest entry for one dumped table
#[derive(Debug, Serialize, Deserialize)]
pub struct TableDigest {
    pub entity: String,
    pub file: String,
    pub row_count: usize,
    pub sha256: String,
}

/// Snapshot manifest, one per run
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub run_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub tables: Vec<TableDigest>,
}

/// Dump all entity tables into `<snapshot_dir>/<run_id>/`, returning the
/// final snapshot path
pub async fn write_snapshot(
    pool: &SqlitePool,
    snapshot_dir: &Path,
    run_id: &str,
) -> ImportResult<PathBuf> {
    let final_dir = snapshot_dir.join(run_id);
    let tmp_dir = snapshot_dir.join(format!("{run_id}.tmp"));
    std::fs::create_dir_all(&tmp_dir)?;

    let mut tables = Vec::new();
    for entity in EntityKind::all() {
        let digest = dump_table(pool, *entity, &tmp_dir).await?;
        tables.push(digest);
    }

    let manifest = SnapshotManifest {
        run_id: run_id.to_string(),
        created_at: chrono::Utc::now(),
        tables,
    };
    let manifest_json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| propd_common::Error::Internal(format!("manifest serialization: {e}")))?;
    std::fs::write(tmp_dir.join("manifest.json"), manifest_json)?;

    std::fs::rename(&tmp_dir, &final_dir)?;
    info!(path = %final_dir.display(), "wrote pre-run snapshot");
    Ok(final_dir)
}

async fn dump_table(
    pool: &SqlitePool,
    entity: EntityKind,
    dir: &Path,
) -> ImportResult<TableDigest> {
    let table = entity.table_name();
    let rows = sqlx::query(&format!("SELECT * FROM {table} ORDER BY id"))
        .fetch_all(pool)
        .await
        .map_err(propd_common::Error::from)?;

    let file_name = format!("{}.csv", entity.as_str());
    let mut writer = csv::Writer::from_writer(Vec::new());

    if let Some(first) = rows.first() {
        let headers: Vec<&str> = first.columns().iter().map(|c| c.name()).collect();
        writer
            .write_record(&headers)
            .map_err(|e| propd_common::Error::Internal(format!("snapshot csv: {e}")))?;
        for row in &rows {
            let cells: Vec<String> = (0..row.columns().len())
                .map(|i| cell_to_string(row, i))
                .collect();
            writer
                .write_record(&cells)
                .map_err(|e| propd_common::Error::Internal(format!("snapshot csv: {e}")))?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| propd_common::Error::Internal(format!("snapshot csv: {e}")))?;
    std::fs::write(dir.join(&file_name), &bytes)?;

    Ok(TableDigest {
        entity: entity.as_str().to_string(),
        file: file_name,
        row_count: rows.len(),
        sha256: hex_digest(&bytes),
    })
}

/// Decode a dynamically typed SQLite cell into its text form
fn cell_to_string(row: &SqliteRow, index: usize) -> String {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value.unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map(|v| v.to_string()).unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value.map(|v| v.to_string()).unwrap_or_default();
    }
    String::new()
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Delete snapshots beyond the newest `retain`, ordered by directory name
/// (run ids sort chronologically)
pub fn prune_snapshots(snapshot_dir: &Path, retain: usize) -> ImportResult<()> {
    let mut dirs: Vec<PathBuf> = match std::fs::read_dir(snapshot_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir() && p.extension().is_none())
            .collect(),
        Err(_) => return Ok(()),
    };
    dirs.sort();

    if dirs.len() <= retain {
        return Ok(());
    }
    let excess = dirs.len() - retain;
    for dir in dirs.into_iter().take(excess) {
        if let Err(e) = std::fs::remove_dir_all(&dir) {
            warn!(path = %dir.display(), error = %e, "failed to prune old snapshot");
        } else {
            info!(path = %dir.display(), "pruned old snapshot");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use propd_common::db::{self, init::init_memory_database};
    use propd_common::models::{User, UserRole};

    #[tokio::test]
    async fn test_snapshot_contains_all_tables_and_digests() {
        let pool = init_memory_database().await.unwrap();
        {
            let mut conn = pool.acquire().await.unwrap();
            let user = User::new("a@x.y".to_string(), UserRole::Owner, "Ann".to_string());
            db::users::insert_user(&mut conn, &user).await.unwrap();
        }

        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot(&pool, dir.path(), "20260101T000000-run")
            .await
            .unwrap();

        assert!(path.join("manifest.json").exists());
        assert!(path.join("users.csv").exists());

        let manifest: SnapshotManifest =
            serde_json::from_str(&std::fs::read_to_string(path.join("manifest.json")).unwrap())
                .unwrap();
        assert_eq!(manifest.tables.len(), EntityKind::all().len());
        let users = manifest
            .tables
            .iter()
            .find(|t| t.entity == "users")
            .unwrap();
        assert_eq!(users.row_count, 1);
        let bytes = std::fs::read(path.join("users.csv")).unwrap();
        assert_eq!(users.sha256, hex_digest(&bytes));
    }

    #[tokio::test]
    async fn test_prune_keeps_newest() {
        let pool = init_memory_database().await.unwrap();
        let dir = tempfile::tempdir().unwrap();

        for run in ["20260101T000000", "20260102T000000", "20260103T000000"] {
            write_snapshot(&pool, dir.path(), run).await.unwrap();
        }
        prune_snapshots(dir.path(), 2).unwrap();

        assert!(!dir.path().join("20260101T000000").exists());
        assert!(dir.path().join("20260102T000000").exists());
        assert!(dir.path().join("20260103T000000").exists());
    }

    #[tokio::test]
    async fn test_empty_table_dump_is_stable() {
        let pool = init_memory_database().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot(&pool, dir.path(), "20260101T000000")
            .await
            .unwrap();
        // Empty tables produce empty files with a zero-row digest
        let bytes = std::fs::read(path.join("leases.csv")).unwrap();
        assert!(bytes.is_empty());
    }
}
