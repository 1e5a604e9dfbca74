//! Lease entity

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lease agreement type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseType {
    MonthToMonth,
    FixedTerm,
    FixedWithRollover,
}

impl LeaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaseType::MonthToMonth => "month_to_month",
            LeaseType::FixedTerm => "fixed_term",
            LeaseType::FixedWithRollover => "fixed_with_rollover",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "month_to_month" => Some(LeaseType::MonthToMonth),
            "fixed_term" => Some(LeaseType::FixedTerm),
            "fixed_with_rollover" => Some(LeaseType::FixedWithRollover),
            _ => None,
        }
    }
}

/// Lease record
///
/// Natural key: (tenant_id, property_id, start_date).
#[derive(Debug, Clone)]
pub struct Lease {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Monthly rent, never negative
    pub rent: f64,
    pub lease_type: LeaseType,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lease {
    /// Create a new lease with a fresh surrogate id
    pub fn new(
        tenant_id: Uuid,
        property_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        rent: f64,
        lease_type: LeaseType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            property_id,
            start_date,
            end_date,
            rent,
            lease_type,
            status: "active".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}
