//! Schema bootstrap against a real on-disk database file

use propd_common::db;
use propd_common::db::init::init_database;
use propd_common::models::{Property, User, UserRole};

#[tokio::test]
async fn test_init_creates_file_and_schema() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("data").join("propd.db");

    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists(), "database file and parent dir are created");

    // All seven tables answer a count
    assert_eq!(db::users::count_users(&pool).await.unwrap(), 0);
    assert_eq!(db::properties::count_properties(&pool).await.unwrap(), 0);
    assert_eq!(db::tenants::count_tenants(&pool).await.unwrap(), 0);
    assert_eq!(db::leases::count_leases(&pool).await.unwrap(), 0);
    assert_eq!(db::maintenance::count_requests(&pool).await.unwrap(), 0);
    assert_eq!(db::transactions::count_transactions(&pool).await.unwrap(), 0);
    assert_eq!(db::balances::count_balances(&pool).await.unwrap(), 0);
}

#[tokio::test]
async fn test_reopening_existing_database_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("propd.db");

    {
        let pool = init_database(&db_path).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let user = User::new("a@x.y".to_string(), UserRole::Owner, "Ann".to_string());
        db::users::insert_user(&mut conn, &user).await.unwrap();
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    assert_eq!(db::users::count_users(&pool).await.unwrap(), 1);
}

#[tokio::test]
async fn test_foreign_keys_enforced_per_connection() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("propd.db")).await.unwrap();

    // A property pointing at a user that does not exist must be rejected
    let mut conn = pool.acquire().await.unwrap();
    let orphan = Property::new(
        "Maple 12".to_string(),
        "12 Maple St".to_string(),
        uuid::Uuid::new_v4(),
    );
    let err = db::properties::insert_property(&mut conn, &orphan)
        .await
        .unwrap_err();
    assert!(err.to_string().to_lowercase().contains("foreign key"));
}
