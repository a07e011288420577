//! Error types for Stela

use thiserror::Error;

/// Core error type for Stela operations
#[derive(Error, Debug)]
pub enum StelaError {
    /// The row source could not execute its query. The cache that issued
    /// the fetch is left untouched when this surfaces.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A catalog row was missing a field or carried an unexpected type.
    /// Batch loads recover from this per row; single-object operations
    /// propagate it.
    #[error("Row field '{field}': {reason}")]
    RowField { field: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A long-running load observed its cancellation token. The affected
    /// cache stays in a known-incomplete state so a retry is forced.
    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl StelaError {
    /// Shorthand for a missing-field conversion failure
    pub fn missing_field(field: &str) -> Self {
        StelaError::RowField {
            field: field.to_string(),
            reason: "missing".to_string(),
        }
    }

    /// Shorthand for a mistyped-field conversion failure
    pub fn bad_field(field: &str, reason: impl Into<String>) -> Self {
        StelaError::RowField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for Stela operations
pub type Result<T> = std::result::Result<T, StelaError>;
