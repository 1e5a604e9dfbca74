//! Database layer
//!
//! Pool initialization, idempotent schema bootstrap, and per-entity query
//! modules. All queries go through explicit executors; no ambient
//! connection state.

pub mod balances;
pub mod init;
pub mod leases;
pub mod maintenance;
pub mod properties;
pub mod tenants;
pub mod transactions;
pub mod users;

pub use init::init_database;

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Outcome of an upsert-by-natural-key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Surrogate id of the affected row (existing id on update)
    pub id: Uuid,
    /// True when an existing row matched the natural key and was updated
    pub updated: bool,
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Internal(format!("invalid uuid in store: {e}")))
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("invalid timestamp in store: {e}")))
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::Internal(format!("invalid date in store: {e}")))
}

pub(crate) fn opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
    s.map(|v| parse_date(&v)).transpose()
}

pub(crate) fn opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
    s.map(|v| parse_uuid(&v)).transpose()
}
