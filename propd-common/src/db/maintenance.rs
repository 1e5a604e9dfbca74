//! Maintenance request database operations
//!
//! Insert-only entity: no natural key, no upsert.

use super::{opt_date, opt_uuid, parse_timestamp, parse_uuid};
use crate::models::{MaintenanceRequest, MaintenanceStatus};
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

fn row_to_request(row: &SqliteRow) -> Result<MaintenanceRequest> {
    let id: String = row.get("id");
    let property: String = row.get("property_id");
    let status_str: String = row.get("status");
    let created: String = row.get("created_at");
    let updated: String = row.get("updated_at");

    Ok(MaintenanceRequest {
        id: parse_uuid(&id)?,
        property_id: parse_uuid(&property)?,
        tenant_id: opt_uuid(row.get("tenant_id"))?,
        vendor_id: opt_uuid(row.get("vendor_id"))?,
        title: row.get("title"),
        description: row.get("description"),
        status: MaintenanceStatus::parse(&status_str).ok_or_else(|| {
            Error::Internal(format!("unknown maintenance status in store: {status_str}"))
        })?,
        priority: row.get("priority"),
        estimated_cost: row.get("estimated_cost"),
        actual_cost: row.get("actual_cost"),
        completion_date: opt_date(row.get("completion_date"))?,
        created_at: parse_timestamp(&created)?,
        updated_at: parse_timestamp(&updated)?,
    })
}

/// Insert a maintenance request
pub async fn insert_request(
    conn: &mut SqliteConnection,
    request: &MaintenanceRequest,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO maintenance_requests
            (id, property_id, tenant_id, vendor_id, title, description, status, priority,
             estimated_cost, actual_cost, completion_date, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(request.id.to_string())
    .bind(request.property_id.to_string())
    .bind(request.tenant_id.map(|id| id.to_string()))
    .bind(request.vendor_id.map(|id| id.to_string()))
    .bind(&request.title)
    .bind(&request.description)
    .bind(request.status.as_str())
    .bind(&request.priority)
    .bind(request.estimated_cost)
    .bind(request.actual_cost)
    .bind(request.completion_date.map(|d| d.to_string()))
    .bind(request.created_at.to_rfc3339())
    .bind(request.updated_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

/// Load a request by surrogate id
pub async fn get_request(pool: &SqlitePool, id: Uuid) -> Result<Option<MaintenanceRequest>> {
    let row = sqlx::query("SELECT * FROM maintenance_requests WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_request).transpose()
}

/// Update a request row by id
pub async fn update_request(pool: &SqlitePool, request: &MaintenanceRequest) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE maintenance_requests
        SET property_id = ?, tenant_id = ?, vendor_id = ?, title = ?, description = ?,
            status = ?, priority = ?, estimated_cost = ?, actual_cost = ?,
            completion_date = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(request.property_id.to_string())
    .bind(request.tenant_id.map(|id| id.to_string()))
    .bind(request.vendor_id.map(|id| id.to_string()))
    .bind(&request.title)
    .bind(&request.description)
    .bind(request.status.as_str())
    .bind(&request.priority)
    .bind(request.estimated_cost)
    .bind(request.actual_cost)
    .bind(request.completion_date.map(|d| d.to_string()))
    .bind(request.updated_at.to_rfc3339())
    .bind(request.id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("maintenance request {}", request.id)));
    }
    Ok(())
}

/// Count maintenance requests
pub async fn count_requests(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM maintenance_requests")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
