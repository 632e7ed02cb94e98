//! Custom error types for Ledgerline
//!
//! This module defines the error hierarchy for the engine using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// Boxed error carried by [`LedgerError::Store`]
pub type StoreCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for Ledgerline operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for input values (amounts, month keys, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested operation conflicts with the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Uniqueness violation reported by a store
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// Failure from a backing store, with the underlying cause preserved
    #[error("Store error: {context}")]
    Store {
        context: String,
        #[source]
        source: StoreCause,
    },
}

impl LedgerError {
    /// Create a "not found" error for templates
    pub fn template_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Template",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for transactions
    pub fn transaction_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Transaction",
            identifier: identifier.into(),
        }
    }

    /// Wrap an underlying store failure
    pub fn store(
        context: impl Into<String>,
        source: impl Into<StoreCause>,
    ) -> Self {
        Self::Store {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is an invalid-state error
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    /// Check if this is a uniqueness violation
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for Ledgerline operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = LedgerError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_error() {
        let err = LedgerError::template_not_found("Rent");
        assert_eq!(err.to_string(), "Template not found: Rent");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_store_error_preserves_cause() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk unplugged");
        let err = LedgerError::store("Failed to save transactions", io_err);

        assert_eq!(err.to_string(), "Store error: Failed to save transactions");
        let cause = err.source().unwrap();
        assert_eq!(cause.to_string(), "disk unplugged");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LedgerError = io_err.into();
        assert!(matches!(err, LedgerError::Io(_)));
    }
}
