//! Domain error types
//!
//! Errors raised while building or validating inventory values: keys that
//! cannot be canonicalized, wire timestamps that do not match the fixed
//! format, and malformed identifiers.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A key is empty after canonicalization or escapes the sync root
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A `lastModified` value does not match `YYYY-MM-DDTHH:MM:SS.ffffffZ`
    #[error("Malformed timestamp: {value:?}")]
    MalformedTimestamp {
        /// The raw wire value as received
        value: String,
    },

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

impl DomainError {
    /// Shorthand for [`DomainError::MalformedTimestamp`]
    pub fn malformed_timestamp(value: impl Into<String>) -> Self {
        Self::MalformedTimestamp {
            value: value.into(),
        }
    }
}
