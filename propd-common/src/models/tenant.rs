//! Tenant entity

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Tenant record
///
/// Natural key: email, when present. Tenants without an email are
/// insert-only; no upsert matching is attempted for them.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    /// Unique when present
    pub email: Option<String>,
    pub phone: Option<String>,
    pub property_id: Option<Uuid>,
    pub lease_start: Option<NaiveDate>,
    pub lease_end: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Create a new tenant with a fresh surrogate id
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email: None,
            phone: None,
            property_id: None,
            lease_start: None,
            lease_end: None,
            created_at: now,
            updated_at: now,
        }
    }
}
