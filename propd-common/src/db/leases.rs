//! Lease database operations
//!
//! Natural key: (tenant_id, property_id, start_date).

use super::{parse_date, parse_timestamp, parse_uuid, UpsertOutcome};
use crate::models::{Lease, LeaseType};
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

fn row_to_lease(row: &SqliteRow) -> Result<Lease> {
    let id: String = row.get("id");
    let tenant: String = row.get("tenant_id");
    let property: String = row.get("property_id");
    let start: String = row.get("start_date");
    let end: String = row.get("end_date");
    let lease_type: String = row.get("lease_type");
    let created: String = row.get("created_at");
    let updated: String = row.get("updated_at");

    Ok(Lease {
        id: parse_uuid(&id)?,
        tenant_id: parse_uuid(&tenant)?,
        property_id: parse_uuid(&property)?,
        start_date: parse_date(&start)?,
        end_date: parse_date(&end)?,
        rent: row.get("rent"),
        lease_type: LeaseType::parse(&lease_type)
            .ok_or_else(|| Error::Internal(format!("unknown lease type in store: {lease_type}")))?,
        status: row.get("status"),
        created_at: parse_timestamp(&created)?,
        updated_at: parse_timestamp(&updated)?,
    })
}

/// Insert a lease row
pub async fn insert_lease(conn: &mut SqliteConnection, lease: &Lease) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO leases
            (id, tenant_id, property_id, start_date, end_date, rent, lease_type, status,
             created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(lease.id.to_string())
    .bind(lease.tenant_id.to_string())
    .bind(lease.property_id.to_string())
    .bind(lease.start_date.to_string())
    .bind(lease.end_date.to_string())
    .bind(lease.rent)
    .bind(lease.lease_type.as_str())
    .bind(&lease.status)
    .bind(lease.created_at.to_rfc3339())
    .bind(lease.updated_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

/// Insert-or-update by (tenant_id, property_id, start_date)
pub async fn upsert_lease(conn: &mut SqliteConnection, lease: &Lease) -> Result<UpsertOutcome> {
    let existing: Option<String> = sqlx::query_scalar(
        "SELECT id FROM leases WHERE tenant_id = ? AND property_id = ? AND start_date = ?",
    )
    .bind(lease.tenant_id.to_string())
    .bind(lease.property_id.to_string())
    .bind(lease.start_date.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        Some(id) => {
            sqlx::query(
                r#"
                UPDATE leases
                SET end_date = ?, rent = ?, lease_type = ?, status = ?, updated_at = ?
                WHERE tenant_id = ? AND property_id = ? AND start_date = ?
                "#,
            )
            .bind(lease.end_date.to_string())
            .bind(lease.rent)
            .bind(lease.lease_type.as_str())
            .bind(&lease.status)
            .bind(lease.updated_at.to_rfc3339())
            .bind(lease.tenant_id.to_string())
            .bind(lease.property_id.to_string())
            .bind(lease.start_date.to_string())
            .execute(&mut *conn)
            .await?;

            Ok(UpsertOutcome {
                id: parse_uuid(&id)?,
                updated: true,
            })
        }
        None => {
            insert_lease(conn, lease).await?;
            Ok(UpsertOutcome {
                id: lease.id,
                updated: false,
            })
        }
    }
}

/// Load a lease by surrogate id
pub async fn get_lease(pool: &SqlitePool, id: Uuid) -> Result<Option<Lease>> {
    let row = sqlx::query("SELECT * FROM leases WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_lease).transpose()
}

/// Load leases for a tenant
pub async fn get_leases_for_tenant(pool: &SqlitePool, tenant_id: Uuid) -> Result<Vec<Lease>> {
    let rows = sqlx::query("SELECT * FROM leases WHERE tenant_id = ? ORDER BY start_date")
        .bind(tenant_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_lease).collect()
}

/// Update a lease row by id
pub async fn update_lease(pool: &SqlitePool, lease: &Lease) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE leases
        SET tenant_id = ?, property_id = ?, start_date = ?, end_date = ?, rent = ?,
            lease_type = ?, status = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(lease.tenant_id.to_string())
    .bind(lease.property_id.to_string())
    .bind(lease.start_date.to_string())
    .bind(lease.end_date.to_string())
    .bind(lease.rent)
    .bind(lease.lease_type.as_str())
    .bind(&lease.status)
    .bind(lease.updated_at.to_rfc3339())
    .bind(lease.id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("lease {}", lease.id)));
    }
    Ok(())
}

/// Count leases
pub async fn count_leases(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leases")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
