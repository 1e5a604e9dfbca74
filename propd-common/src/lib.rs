//! # propd Common Library
//!
//! Shared code for the propd property-management backend:
//! - Canonical data model (entity records and enums)
//! - Database layer (pool init, schema bootstrap, per-entity queries)
//! - Configuration loading
//! - Logging setup
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;

pub use error::{Error, Result};
