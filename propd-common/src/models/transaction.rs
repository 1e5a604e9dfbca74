//! Financial transaction entity

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Financial ledger entry for a property
///
/// Natural key: (property_id, transaction_date, transaction_type, amount).
/// Amount is signed and never zero; income positive, expense negative by
/// convention, with type/category carrying the business meaning.
#[derive(Debug, Clone)]
pub struct FinancialTransaction {
    pub id: Uuid,
    pub property_id: Uuid,
    pub transaction_date: NaiveDate,
    pub transaction_type: String,
    pub amount: f64,
    pub category: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FinancialTransaction {
    /// Create a new transaction with a fresh surrogate id
    pub fn new(
        property_id: Uuid,
        transaction_date: NaiveDate,
        transaction_type: String,
        amount: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            property_id,
            transaction_date,
            transaction_type,
            amount,
            category: None,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }
}
