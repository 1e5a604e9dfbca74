//! Outstanding balance database operations
//!
//! Natural key: (tenant_id, property_id, due_date).

use super::{parse_date, parse_timestamp, parse_uuid, UpsertOutcome};
use crate::models::OutstandingBalance;
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

fn row_to_balance(row: &SqliteRow) -> Result<OutstandingBalance> {
    let id: String = row.get("id");
    let tenant: String = row.get("tenant_id");
    let property: String = row.get("property_id");
    let due: String = row.get("due_date");
    let resolved: i64 = row.get("resolved");
    let created: String = row.get("created_at");
    let updated: String = row.get("updated_at");

    Ok(OutstandingBalance {
        id: parse_uuid(&id)?,
        tenant_id: parse_uuid(&tenant)?,
        property_id: parse_uuid(&property)?,
        amount_due: row.get("amount_due"),
        due_date: parse_date(&due)?,
        resolved: resolved != 0,
        created_at: parse_timestamp(&created)?,
        updated_at: parse_timestamp(&updated)?,
    })
}

/// Insert a balance row
pub async fn insert_balance(
    conn: &mut SqliteConnection,
    balance: &OutstandingBalance,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO outstanding_balances
            (id, tenant_id, property_id, amount_due, due_date, resolved, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(balance.id.to_string())
    .bind(balance.tenant_id.to_string())
    .bind(balance.property_id.to_string())
    .bind(balance.amount_due)
    .bind(balance.due_date.to_string())
    .bind(balance.resolved as i64)
    .bind(balance.created_at.to_rfc3339())
    .bind(balance.updated_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

/// Insert-or-update by (tenant_id, property_id, due_date)
pub async fn upsert_balance(
    conn: &mut SqliteConnection,
    balance: &OutstandingBalance,
) -> Result<UpsertOutcome> {
    let existing: Option<String> = sqlx::query_scalar(
        "SELECT id FROM outstanding_balances WHERE tenant_id = ? AND property_id = ? AND due_date = ?",
    )
    .bind(balance.tenant_id.to_string())
    .bind(balance.property_id.to_string())
    .bind(balance.due_date.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        Some(id) => {
            sqlx::query(
                r#"
                UPDATE outstanding_balances
                SET amount_due = ?, resolved = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(balance.amount_due)
            .bind(balance.resolved as i64)
            .bind(balance.updated_at.to_rfc3339())
            .bind(&id)
            .execute(&mut *conn)
            .await?;

            Ok(UpsertOutcome {
                id: parse_uuid(&id)?,
                updated: true,
            })
        }
        None => {
            insert_balance(conn, balance).await?;
            Ok(UpsertOutcome {
                id: balance.id,
                updated: false,
            })
        }
    }
}

/// Load a balance by surrogate id
pub async fn get_balance(pool: &SqlitePool, id: Uuid) -> Result<Option<OutstandingBalance>> {
    let row = sqlx::query("SELECT * FROM outstanding_balances WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_balance).transpose()
}

/// Load unresolved balances for a tenant
pub async fn get_open_balances_for_tenant(
    pool: &SqlitePool,
    tenant_id: Uuid,
) -> Result<Vec<OutstandingBalance>> {
    let rows = sqlx::query(
        "SELECT * FROM outstanding_balances WHERE tenant_id = ? AND resolved = 0 ORDER BY due_date",
    )
    .bind(tenant_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_balance).collect()
}

/// Update a balance row by id
pub async fn update_balance(pool: &SqlitePool, balance: &OutstandingBalance) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE outstanding_balances
        SET tenant_id = ?, property_id = ?, amount_due = ?, due_date = ?, resolved = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(balance.tenant_id.to_string())
    .bind(balance.property_id.to_string())
    .bind(balance.amount_due)
    .bind(balance.due_date.to_string())
    .bind(balance.resolved as i64)
    .bind(balance.updated_at.to_rfc3339())
    .bind(balance.id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("balance {}", balance.id)));
    }
    Ok(())
}

/// Count balances
pub async fn count_balances(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM outstanding_balances")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
