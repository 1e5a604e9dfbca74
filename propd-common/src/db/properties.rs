//! Property database operations
//!
//! Natural key: (title, address_line1).

use super::{parse_timestamp, parse_uuid, UpsertOutcome};
use crate::models::{Property, PropertyStatus};
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

fn row_to_property(row: &SqliteRow) -> Result<Property> {
    let id: String = row.get("id");
    let owner: String = row.get("owner_id");
    let status_str: String = row.get("status");
    let created: String = row.get("created_at");
    let updated: String = row.get("updated_at");

    Ok(Property {
        id: parse_uuid(&id)?,
        title: row.get("title"),
        address_line1: row.get("address_line1"),
        city: row.get("city"),
        state: row.get("state"),
        postal_code: row.get("postal_code"),
        building_type: row.get("building_type"),
        status: PropertyStatus::parse(&status_str).ok_or_else(|| {
            Error::Internal(format!("unknown property status in store: {status_str}"))
        })?,
        rent: row.get("rent"),
        owner_id: parse_uuid(&owner)?,
        created_at: parse_timestamp(&created)?,
        updated_at: parse_timestamp(&updated)?,
    })
}

/// Insert a property row
pub async fn insert_property(conn: &mut SqliteConnection, property: &Property) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO properties
            (id, title, address_line1, city, state, postal_code, building_type,
             status, rent, owner_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(property.id.to_string())
    .bind(&property.title)
    .bind(&property.address_line1)
    .bind(&property.city)
    .bind(&property.state)
    .bind(&property.postal_code)
    .bind(&property.building_type)
    .bind(property.status.as_str())
    .bind(property.rent)
    .bind(property.owner_id.to_string())
    .bind(property.created_at.to_rfc3339())
    .bind(property.updated_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

/// Insert-or-update by (title, address_line1)
pub async fn upsert_property(
    conn: &mut SqliteConnection,
    property: &Property,
) -> Result<UpsertOutcome> {
    let existing: Option<String> =
        sqlx::query_scalar("SELECT id FROM properties WHERE title = ? AND address_line1 = ?")
            .bind(&property.title)
            .bind(&property.address_line1)
            .fetch_optional(&mut *conn)
            .await?;

    match existing {
        Some(id) => {
            sqlx::query(
                r#"
                UPDATE properties
                SET city = ?, state = ?, postal_code = ?, building_type = ?,
                    status = ?, rent = ?, updated_at = ?
                WHERE title = ? AND address_line1 = ?
                "#,
            )
            .bind(&property.city)
            .bind(&property.state)
            .bind(&property.postal_code)
            .bind(&property.building_type)
            .bind(property.status.as_str())
            .bind(property.rent)
            .bind(property.updated_at.to_rfc3339())
            .bind(&property.title)
            .bind(&property.address_line1)
            .execute(&mut *conn)
            .await?;

            Ok(UpsertOutcome {
                id: parse_uuid(&id)?,
                updated: true,
            })
        }
        None => {
            insert_property(conn, property).await?;
            Ok(UpsertOutcome {
                id: property.id,
                updated: false,
            })
        }
    }
}

/// Load a property by surrogate id
pub async fn get_property(pool: &SqlitePool, id: Uuid) -> Result<Option<Property>> {
    let row = sqlx::query("SELECT * FROM properties WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_property).transpose()
}

/// Load a property by natural key
pub async fn get_property_by_natural_key(
    pool: &SqlitePool,
    title: &str,
    address_line1: &str,
) -> Result<Option<Property>> {
    let row = sqlx::query("SELECT * FROM properties WHERE title = ? AND address_line1 = ?")
        .bind(title)
        .bind(address_line1)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_property).transpose()
}

/// Referential lookup: property id by (title, address_line1)
pub async fn find_property_id(
    pool: &SqlitePool,
    title: &str,
    address_line1: &str,
) -> Result<Option<Uuid>> {
    let id: Option<String> =
        sqlx::query_scalar("SELECT id FROM properties WHERE title = ? AND address_line1 = ?")
            .bind(title)
            .bind(address_line1)
            .fetch_optional(pool)
            .await?;

    id.as_deref().map(parse_uuid).transpose()
}

/// Referential lookup tolerant of a missing address column: falls back to
/// a title-only match when it is unambiguous
pub async fn find_property_id_by_title(pool: &SqlitePool, title: &str) -> Result<Option<Uuid>> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM properties WHERE title = ?")
        .bind(title)
        .fetch_all(pool)
        .await?;

    match ids.as_slice() {
        [id] => Ok(Some(parse_uuid(id)?)),
        _ => Ok(None),
    }
}

/// Update a property row by id
pub async fn update_property(pool: &SqlitePool, property: &Property) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE properties
        SET title = ?, address_line1 = ?, city = ?, state = ?, postal_code = ?,
            building_type = ?, status = ?, rent = ?, owner_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&property.title)
    .bind(&property.address_line1)
    .bind(&property.city)
    .bind(&property.state)
    .bind(&property.postal_code)
    .bind(&property.building_type)
    .bind(property.status.as_str())
    .bind(property.rent)
    .bind(property.owner_id.to_string())
    .bind(property.updated_at.to_rfc3339())
    .bind(property.id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("property {}", property.id)));
    }
    Ok(())
}

/// Count properties
pub async fn count_properties(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM properties")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;
    use crate::db::users::insert_user;
    use crate::models::{User, UserRole};

    async fn seed_owner(pool: &SqlitePool) -> Uuid {
        let mut conn = pool.acquire().await.unwrap();
        let owner = User::new("owner@x.y".to_string(), UserRole::Owner, "Owner".to_string());
        insert_user(&mut conn, &owner).await.unwrap();
        owner.id
    }

    #[tokio::test]
    async fn test_upsert_by_title_and_address() {
        let pool = init_memory_database().await.unwrap();
        let owner_id = seed_owner(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        let mut p = Property::new("Maple 12".to_string(), "12 Maple St".to_string(), owner_id);
        p.rent = 1800.0;
        let out1 = upsert_property(&mut conn, &p).await.unwrap();
        assert!(!out1.updated);

        let mut p2 = Property::new("Maple 12".to_string(), "12 Maple St".to_string(), owner_id);
        p2.rent = 1950.0;
        let out2 = upsert_property(&mut conn, &p2).await.unwrap();
        assert!(out2.updated);
        assert_eq!(out1.id, out2.id);
        drop(conn);

        let loaded = get_property(&pool, out1.id).await.unwrap().unwrap();
        assert_eq!(loaded.rent, 1950.0);
    }

    #[tokio::test]
    async fn test_fk_enforced_on_owner() {
        let pool = init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let p = Property::new("Oak 7".to_string(), "7 Oak Ave".to_string(), Uuid::new_v4());
        let err = insert_property(&mut conn, &p).await;
        assert!(err.is_err(), "owner_id must reference an existing user");
    }
}
