//! Tenant database operations
//!
//! Natural key: email, when present. A tenant without an email is
//! insert-only; the caller is expected to have made that decision.

use super::{opt_date, opt_uuid, parse_timestamp, parse_uuid, UpsertOutcome};
use crate::models::Tenant;
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

fn row_to_tenant(row: &SqliteRow) -> Result<Tenant> {
    let id: String = row.get("id");
    let created: String = row.get("created_at");
    let updated: String = row.get("updated_at");

    Ok(Tenant {
        id: parse_uuid(&id)?,
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        property_id: opt_uuid(row.get("property_id"))?,
        lease_start: opt_date(row.get("lease_start"))?,
        lease_end: opt_date(row.get("lease_end"))?,
        created_at: parse_timestamp(&created)?,
        updated_at: parse_timestamp(&updated)?,
    })
}

/// Insert a tenant row
pub async fn insert_tenant(conn: &mut SqliteConnection, tenant: &Tenant) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tenants
            (id, name, email, phone, property_id, lease_start, lease_end, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(tenant.id.to_string())
    .bind(&tenant.name)
    .bind(&tenant.email)
    .bind(&tenant.phone)
    .bind(tenant.property_id.map(|id| id.to_string()))
    .bind(tenant.lease_start.map(|d| d.to_string()))
    .bind(tenant.lease_end.map(|d| d.to_string()))
    .bind(tenant.created_at.to_rfc3339())
    .bind(tenant.updated_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

/// Insert-or-update by email
///
/// Tenants without an email always insert a new row.
pub async fn upsert_tenant(conn: &mut SqliteConnection, tenant: &Tenant) -> Result<UpsertOutcome> {
    let existing: Option<String> = match &tenant.email {
        Some(email) => sqlx::query_scalar("SELECT id FROM tenants WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut *conn)
            .await?,
        None => None,
    };

    match existing {
        Some(id) => {
            sqlx::query(
                r#"
                UPDATE tenants
                SET name = ?, phone = ?, property_id = ?, lease_start = ?, lease_end = ?,
                    updated_at = ?
                WHERE email = ?
                "#,
            )
            .bind(&tenant.name)
            .bind(&tenant.phone)
            .bind(tenant.property_id.map(|id| id.to_string()))
            .bind(tenant.lease_start.map(|d| d.to_string()))
            .bind(tenant.lease_end.map(|d| d.to_string()))
            .bind(tenant.updated_at.to_rfc3339())
            .bind(&tenant.email)
            .execute(&mut *conn)
            .await?;

            Ok(UpsertOutcome {
                id: parse_uuid(&id)?,
                updated: true,
            })
        }
        None => {
            insert_tenant(conn, tenant).await?;
            Ok(UpsertOutcome {
                id: tenant.id,
                updated: false,
            })
        }
    }
}

/// Load a tenant by surrogate id
pub async fn get_tenant(pool: &SqlitePool, id: Uuid) -> Result<Option<Tenant>> {
    let row = sqlx::query("SELECT * FROM tenants WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_tenant).transpose()
}

/// Load a tenant by email (natural key)
pub async fn get_tenant_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Tenant>> {
    let row = sqlx::query("SELECT * FROM tenants WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_tenant).transpose()
}

/// Referential lookup: tenant id by email
pub async fn find_tenant_id_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Uuid>> {
    let id: Option<String> = sqlx::query_scalar("SELECT id FROM tenants WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    id.as_deref().map(parse_uuid).transpose()
}

/// Update a tenant row by id
pub async fn update_tenant(pool: &SqlitePool, tenant: &Tenant) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE tenants
        SET name = ?, email = ?, phone = ?, property_id = ?, lease_start = ?, lease_end = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&tenant.name)
    .bind(&tenant.email)
    .bind(&tenant.phone)
    .bind(tenant.property_id.map(|id| id.to_string()))
    .bind(tenant.lease_start.map(|d| d.to_string()))
    .bind(tenant.lease_end.map(|d| d.to_string()))
    .bind(tenant.updated_at.to_rfc3339())
    .bind(tenant.id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("tenant {}", tenant.id)));
    }
    Ok(())
}

/// Count tenants
pub async fn count_tenants(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenants")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;

    #[tokio::test]
    async fn test_tenant_without_email_always_inserts() {
        let pool = init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let t1 = Tenant::new("No Mail".to_string());
        let t2 = Tenant::new("No Mail".to_string());
        let o1 = upsert_tenant(&mut conn, &t1).await.unwrap();
        let o2 = upsert_tenant(&mut conn, &t2).await.unwrap();

        assert!(!o1.updated);
        assert!(!o2.updated);
        assert_ne!(o1.id, o2.id);
        drop(conn);
        assert_eq!(count_tenants(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_tenant_date_ordering_enforced() {
        let pool = init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let mut t = Tenant::new("Backwards".to_string());
        t.lease_start = Some(chrono::NaiveDate::from_ymd_opt(2026, 6, 1).unwrap());
        t.lease_end = Some(chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());

        assert!(insert_tenant(&mut conn, &t).await.is_err());
    }
}
