//! Error types for propd-forms

use thiserror::Error;

/// Fill operation errors
#[derive(Debug, Error)]
pub enum FormError {
    /// The template store has no template under the given id
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// The template carries no fillable form fields
    #[error("Template is not fillable")]
    TemplateNotFillable,

    /// Strict mode: a mapping key names no field in the template
    #[error("Field not in template: {0}")]
    FieldNotInTemplate(String),

    /// Serializing or writing the filled document failed
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// The template bytes are not a readable document
    #[error("Malformed template: {0}")]
    Malformed(String),

    /// I/O failure in the template store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for fill operations
pub type FormResult<T> = Result<T, FormError>;
