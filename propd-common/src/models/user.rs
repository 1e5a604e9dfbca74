//! User entity
//!
//! Users are property owners, tenants with portal access, vendors, or
//! administrators. Email is the natural key and is stored lowercased.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Owner,
    Tenant,
    Vendor,
    Admin,
}

impl UserRole {
    /// Database string form
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Owner => "owner",
            UserRole::Tenant => "tenant",
            UserRole::Vendor => "vendor",
            UserRole::Admin => "admin",
        }
    }

    /// Parse from database string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(UserRole::Owner),
            "tenant" => Some(UserRole::Tenant),
            "vendor" => Some(UserRole::Vendor),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// User account record
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    /// Unique, always lowercase
    pub email: String,
    pub role: UserRole,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user record with a fresh surrogate id
    pub fn new(email: String, role: UserRole, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.to_lowercase(),
            role,
            name,
            phone: None,
            address: None,
            created_at: now,
            updated_at: now,
        }
    }
}
