//! Query error types
//!
//! Error codes:
//! - SEAL_QUERY_INVALID (ERROR)
//!
//! Raised by `QueryBuilder::build` before any index is touched. A query that
//! matches nothing is never an error.

use std::fmt;

/// Malformed query
#[derive(Debug, Clone)]
pub struct QueryError {
    /// Human-readable message
    message: String,
    /// Field name if applicable
    field: Option<String>,
}

impl QueryError {
    /// Create a query invalid error
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            message: reason.into(),
            field: None,
        }
    }

    /// Create a query invalid error naming the offending field
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let f = field.into();
        Self {
            message: format!("field '{}': {}", f, reason.into()),
            field: Some(f),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        "SEAL_QUERY_INVALID"
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the field name if applicable
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Query errors are never fatal
    pub fn is_fatal(&self) -> bool {
        false
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code(), self.message)
    }
}

impl std::error::Error for QueryError {}

/// Result type for query construction
pub type QueryResult<T> = Result<T, QueryError>;
