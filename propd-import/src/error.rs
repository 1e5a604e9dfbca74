//! Error types for propd-import
//!
//! Fatal conditions only. Per-row problems are data: they are collected
//! into the run report and never travel through this enum.

use thiserror::Error;

/// Fatal ingestion errors
#[derive(Debug, Error)]
pub enum ImportError {
    /// Source directory missing or contains no input files
    #[error("Input not found: {0}")]
    InputNotFound(String),

    /// A file could not be classified and configuration forbids skipping
    #[error("Unrecognized file: {0}")]
    UnrecognizedFile(String),

    /// The configuration bundle is internally inconsistent
    #[error("Configuration invalid: {0}")]
    ConfigurationInvalid(String),

    /// Aggregate error count crossed the run threshold
    #[error("Too many errors: {count} errors exceed the run threshold of {threshold}")]
    TooManyErrors { count: usize, threshold: usize },

    /// Persistence failure that survived the retry policy
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// I/O failure outside the store (reading input, writing snapshot/report)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// propd-common error
    #[error("Common error: {0}")]
    Common(#[from] propd_common::Error),
}

/// Result type for fatal ingestion paths
pub type ImportResult<T> = Result<T, ImportError>;
