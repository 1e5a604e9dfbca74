//! Outstanding balance entity

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Outstanding balance owed by a tenant for a property
///
/// Natural key: (tenant_id, property_id, due_date).
#[derive(Debug, Clone)]
pub struct OutstandingBalance {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    /// Never negative
    pub amount_due: f64,
    pub due_date: NaiveDate,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OutstandingBalance {
    /// Create a new unresolved balance with a fresh surrogate id
    pub fn new(tenant_id: Uuid, property_id: Uuid, amount_due: f64, due_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            property_id,
            amount_due,
            due_date,
            resolved: false,
            created_at: now,
            updated_at: now,
        }
    }
}
