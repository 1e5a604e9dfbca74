//! Financial transaction database operations
//!
//! Natural key: (property_id, transaction_date, transaction_type, amount).
//! Re-imports of the same ledger export match on the full tuple, so a
//! second run updates category/description instead of duplicating entries.

use super::{parse_date, parse_timestamp, parse_uuid, UpsertOutcome};
use crate::models::FinancialTransaction;
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

fn row_to_transaction(row: &SqliteRow) -> Result<FinancialTransaction> {
    let id: String = row.get("id");
    let property: String = row.get("property_id");
    let date: String = row.get("transaction_date");
    let created: String = row.get("created_at");
    let updated: String = row.get("updated_at");

    Ok(FinancialTransaction {
        id: parse_uuid(&id)?,
        property_id: parse_uuid(&property)?,
        transaction_date: parse_date(&date)?,
        transaction_type: row.get("transaction_type"),
        amount: row.get("amount"),
        category: row.get("category"),
        description: row.get("description"),
        created_at: parse_timestamp(&created)?,
        updated_at: parse_timestamp(&updated)?,
    })
}

/// Insert a transaction row
pub async fn insert_transaction(
    conn: &mut SqliteConnection,
    tx: &FinancialTransaction,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO financial_transactions
            (id, property_id, transaction_date, transaction_type, amount, category,
             description, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(tx.id.to_string())
    .bind(tx.property_id.to_string())
    .bind(tx.transaction_date.to_string())
    .bind(&tx.transaction_type)
    .bind(tx.amount)
    .bind(&tx.category)
    .bind(&tx.description)
    .bind(tx.created_at.to_rfc3339())
    .bind(tx.updated_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

/// Insert-or-update by the full natural tuple
pub async fn upsert_transaction(
    conn: &mut SqliteConnection,
    tx: &FinancialTransaction,
) -> Result<UpsertOutcome> {
    let existing: Option<String> = sqlx::query_scalar(
        r#"
        SELECT id FROM financial_transactions
        WHERE property_id = ? AND transaction_date = ? AND transaction_type = ? AND amount = ?
        "#,
    )
    .bind(tx.property_id.to_string())
    .bind(tx.transaction_date.to_string())
    .bind(&tx.transaction_type)
    .bind(tx.amount)
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        Some(id) => {
            sqlx::query(
                r#"
                UPDATE financial_transactions
                SET category = ?, description = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&tx.category)
            .bind(&tx.description)
            .bind(tx.updated_at.to_rfc3339())
            .bind(&id)
            .execute(&mut *conn)
            .await?;

            Ok(UpsertOutcome {
                id: parse_uuid(&id)?,
                updated: true,
            })
        }
        None => {
            insert_transaction(conn, tx).await?;
            Ok(UpsertOutcome {
                id: tx.id,
                updated: false,
            })
        }
    }
}

/// Load a transaction by surrogate id
pub async fn get_transaction(pool: &SqlitePool, id: Uuid) -> Result<Option<FinancialTransaction>> {
    let row = sqlx::query("SELECT * FROM financial_transactions WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_transaction).transpose()
}

/// Load the ledger for a property, oldest first
pub async fn get_transactions_for_property(
    pool: &SqlitePool,
    property_id: Uuid,
) -> Result<Vec<FinancialTransaction>> {
    let rows = sqlx::query(
        "SELECT * FROM financial_transactions WHERE property_id = ? ORDER BY transaction_date",
    )
    .bind(property_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_transaction).collect()
}

/// Update a transaction row by id
pub async fn update_transaction(pool: &SqlitePool, tx: &FinancialTransaction) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE financial_transactions
        SET property_id = ?, transaction_date = ?, transaction_type = ?, amount = ?,
            category = ?, description = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(tx.property_id.to_string())
    .bind(tx.transaction_date.to_string())
    .bind(&tx.transaction_type)
    .bind(tx.amount)
    .bind(&tx.category)
    .bind(&tx.description)
    .bind(tx.updated_at.to_rfc3339())
    .bind(tx.id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("transaction {}", tx.id)));
    }
    Ok(())
}

/// Count transactions
pub async fn count_transactions(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM financial_transactions")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
