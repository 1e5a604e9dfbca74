//! Database initialization
//!
//! Opens (or creates) the SQLite database, applies connection pragmas,
//! and runs the idempotent schema bootstrap for the seven entity tables.
//! Uniqueness and referential invariants live here as UNIQUE / FOREIGN KEY /
//! CHECK constraints; everything else is application-level validation.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // WAL allows concurrent readers while a migration run is committing.
    // The busy timeout is short; longer lock contention is handled by
    // the caller's retry-with-backoff policy.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(1000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    bootstrap_schema(&pool).await?;

    Ok(pool)
}

/// Open an in-memory database with the full schema (test and dry-tooling use)
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(":memory:")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    bootstrap_schema(&pool).await?;
    Ok(pool)
}

async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_properties_table(pool).await?;
    create_tenants_table(pool).await?;
    create_leases_table(pool).await?;
    create_maintenance_requests_table(pool).await?;
    create_financial_transactions_table(pool).await?;
    create_outstanding_balances_table(pool).await?;

    Ok(())
}

/// Create the users table
pub async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL CHECK (role IN ('owner', 'tenant', 'vendor', 'admin')),
            name TEXT NOT NULL,
            phone TEXT,
            address TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK (email = lower(email))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the properties table
pub async fn create_properties_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS properties (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            address_line1 TEXT NOT NULL,
            city TEXT,
            state TEXT,
            postal_code TEXT,
            building_type TEXT,
            status TEXT NOT NULL DEFAULT 'available'
                CHECK (status IN ('available', 'occupied', 'maintenance')),
            rent REAL NOT NULL DEFAULT 0 CHECK (rent >= 0),
            owner_id TEXT NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (title, address_line1)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_properties_owner ON properties(owner_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the tenants table
pub async fn create_tenants_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tenants (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT UNIQUE,
            phone TEXT,
            property_id TEXT REFERENCES properties(id),
            lease_start TEXT,
            lease_end TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK (lease_start IS NULL OR lease_end IS NULL OR lease_start <= lease_end)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tenants_property ON tenants(property_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the leases table
pub async fn create_leases_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leases (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            property_id TEXT NOT NULL REFERENCES properties(id),
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            rent REAL NOT NULL CHECK (rent >= 0),
            lease_type TEXT NOT NULL
                CHECK (lease_type IN ('month_to_month', 'fixed_term', 'fixed_with_rollover')),
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (tenant_id, property_id, start_date),
            CHECK (start_date <= end_date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leases_tenant ON leases(tenant_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leases_property ON leases(property_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the maintenance_requests table
pub async fn create_maintenance_requests_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS maintenance_requests (
            id TEXT PRIMARY KEY,
            property_id TEXT NOT NULL REFERENCES properties(id),
            tenant_id TEXT REFERENCES tenants(id),
            vendor_id TEXT REFERENCES users(id),
            title TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'in_progress', 'completed', 'cancelled')),
            priority TEXT,
            estimated_cost REAL CHECK (estimated_cost IS NULL OR estimated_cost >= 0),
            actual_cost REAL CHECK (actual_cost IS NULL OR actual_cost >= 0),
            completion_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK ((status = 'completed' AND completion_date IS NOT NULL)
                OR (status != 'completed' AND completion_date IS NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_maintenance_property ON maintenance_requests(property_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_maintenance_status ON maintenance_requests(status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the financial_transactions table
pub async fn create_financial_transactions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS financial_transactions (
            id TEXT PRIMARY KEY,
            property_id TEXT NOT NULL REFERENCES properties(id),
            transaction_date TEXT NOT NULL,
            transaction_type TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount != 0),
            category TEXT,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (property_id, transaction_date, transaction_type, amount)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transactions_property ON financial_transactions(property_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transactions_date ON financial_transactions(transaction_date)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the outstanding_balances table
pub async fn create_outstanding_balances_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS outstanding_balances (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            property_id TEXT NOT NULL REFERENCES properties(id),
            amount_due REAL NOT NULL CHECK (amount_due >= 0),
            due_date TEXT NOT NULL,
            resolved INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (tenant_id, property_id, due_date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_balances_tenant ON outstanding_balances(tenant_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
