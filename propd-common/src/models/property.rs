//! Property entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Occupancy status of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Available,
    Occupied,
    Maintenance,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Available => "available",
            PropertyStatus::Occupied => "occupied",
            PropertyStatus::Maintenance => "maintenance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(PropertyStatus::Available),
            "occupied" => Some(PropertyStatus::Occupied),
            "maintenance" => Some(PropertyStatus::Maintenance),
            _ => None,
        }
    }
}

/// Property record
///
/// Natural key: (title, address_line1). The address is kept as separate
/// line/city/state/postal columns to match the cleaned import shape.
#[derive(Debug, Clone)]
pub struct Property {
    pub id: Uuid,
    pub title: String,
    pub address_line1: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub building_type: Option<String>,
    pub status: PropertyStatus,
    /// Monthly rent, never negative
    pub rent: f64,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Create a new property with a fresh surrogate id
    pub fn new(title: String, address_line1: String, owner_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            address_line1,
            city: None,
            state: None,
            postal_code: None,
            building_type: None,
            status: PropertyStatus::Available,
            rent: 0.0,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }
}
