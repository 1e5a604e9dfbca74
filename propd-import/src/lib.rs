//! propd-import - CSV Ingestion Pipeline
//!
//! Transforms a directory of heterogeneous tabular exports into validated,
//! referentially sound rows in the propd data model. Each input file moves
//! through Classify -> Parse -> Clean -> Validate -> Resolve -> Stage ->
//! Commit, with per-row error isolation, batched transactions, optional
//! dry-run, and a pre-run snapshot of the affected tables.
//!
//! The single public operation is [`pipeline::run_migration`]; everything
//! else is the machinery behind it.

pub mod bind;
pub mod classify;
pub mod clean;
pub mod commit;
pub mod config;
pub mod entity;
pub mod error;
pub mod parse;
pub mod pipeline;
pub mod report;
pub mod resolve;
pub mod retry;
pub mod snapshot;
pub mod types;
pub mod validate;

pub use config::ImportConfig;
pub use error::ImportError;
pub use pipeline::run_migration;
pub use types::{RunReport, RunState};
