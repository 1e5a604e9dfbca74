//! Maintenance request entity

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a maintenance request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl MaintenanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceStatus::Pending => "pending",
            MaintenanceStatus::InProgress => "in_progress",
            MaintenanceStatus::Completed => "completed",
            MaintenanceStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MaintenanceStatus::Pending),
            "in_progress" => Some(MaintenanceStatus::InProgress),
            "completed" => Some(MaintenanceStatus::Completed),
            "cancelled" => Some(MaintenanceStatus::Cancelled),
            _ => None,
        }
    }
}

/// Maintenance request record
///
/// Insert-only: no natural key is declared, repeated imports create
/// new requests. completion_date is set iff status is completed.
#[derive(Debug, Clone)]
pub struct MaintenanceRequest {
    pub id: Uuid,
    pub property_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: MaintenanceStatus,
    pub priority: Option<String>,
    pub estimated_cost: Option<f64>,
    pub actual_cost: Option<f64>,
    pub completion_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MaintenanceRequest {
    /// Create a new pending request with a fresh surrogate id
    pub fn new(property_id: Uuid, title: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            property_id,
            tenant_id: None,
            vendor_id: None,
            title,
            description: None,
            status: MaintenanceStatus::Pending,
            priority: None,
            estimated_cost: None,
            actual_cost: None,
            completion_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}
