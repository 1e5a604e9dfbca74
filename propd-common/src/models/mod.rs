//! Canonical data model
//!
//! Typed entity records for the seven persisted entities plus their
//! enum-typed discriminants. Entities reference each other by surrogate
//! id (UUID stored as TEXT), never by owning pointers.

pub mod balance;
pub mod lease;
pub mod maintenance;
pub mod property;
pub mod tenant;
pub mod transaction;
pub mod user;

pub use balance::OutstandingBalance;
pub use lease::{Lease, LeaseType};
pub use maintenance::{MaintenanceRequest, MaintenanceStatus};
pub use property::{Property, PropertyStatus};
pub use tenant::Tenant;
pub use transaction::FinancialTransaction;
pub use user::{User, UserRole};
