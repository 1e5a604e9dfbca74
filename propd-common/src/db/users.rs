//! User database operations
//!
//! Natural key: email (lowercased).

use super::{parse_timestamp, parse_uuid, UpsertOutcome};
use crate::models::{User, UserRole};
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

fn row_to_user(row: &SqliteRow) -> Result<User> {
    let id: String = row.get("id");
    let role_str: String = row.get("role");
    let created: String = row.get("created_at");
    let updated: String = row.get("updated_at");

    Ok(User {
        id: parse_uuid(&id)?,
        email: row.get("email"),
        role: UserRole::parse(&role_str)
            .ok_or_else(|| Error::Internal(format!("unknown user role in store: {role_str}")))?,
        name: row.get("name"),
        phone: row.get("phone"),
        address: row.get("address"),
        created_at: parse_timestamp(&created)?,
        updated_at: parse_timestamp(&updated)?,
    })
}

/// Insert a user row
pub async fn insert_user(conn: &mut SqliteConnection, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email, role, name, phone, address, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.email)
    .bind(user.role.as_str())
    .bind(&user.name)
    .bind(&user.phone)
    .bind(&user.address)
    .bind(user.created_at.to_rfc3339())
    .bind(user.updated_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

/// Insert-or-update by email
///
/// On conflict the existing row keeps its id; name, role, phone and
/// address are refreshed from the incoming record.
pub async fn upsert_user(conn: &mut SqliteConnection, user: &User) -> Result<UpsertOutcome> {
    let existing: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(&user.email)
        .fetch_optional(&mut *conn)
        .await?;

    match existing {
        Some(id) => {
            sqlx::query(
                r#"
                UPDATE users
                SET role = ?, name = ?, phone = ?, address = ?, updated_at = ?
                WHERE email = ?
                "#,
            )
            .bind(user.role.as_str())
            .bind(&user.name)
            .bind(&user.phone)
            .bind(&user.address)
            .bind(user.updated_at.to_rfc3339())
            .bind(&user.email)
            .execute(&mut *conn)
            .await?;

            Ok(UpsertOutcome {
                id: parse_uuid(&id)?,
                updated: true,
            })
        }
        None => {
            insert_user(conn, user).await?;
            Ok(UpsertOutcome {
                id: user.id,
                updated: false,
            })
        }
    }
}

/// Load a user by surrogate id
pub async fn get_user(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_user).transpose()
}

/// Load a user by email (natural key)
pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE email = ?")
        .bind(email.to_lowercase())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_user).transpose()
}

/// Referential lookup: user id by email
pub async fn find_user_id_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Uuid>> {
    let id: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(email.to_lowercase())
        .fetch_optional(pool)
        .await?;

    id.as_deref().map(parse_uuid).transpose()
}

/// Update a user row by id
pub async fn update_user(pool: &SqlitePool, user: &User) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET email = ?, role = ?, name = ?, phone = ?, address = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.email)
    .bind(user.role.as_str())
    .bind(&user.name)
    .bind(&user.phone)
    .bind(&user.address)
    .bind(user.updated_at.to_rfc3339())
    .bind(user.id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("user {}", user.id)));
    }
    Ok(())
}

/// Count users
pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
