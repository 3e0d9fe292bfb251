//! Builder error types
//!
//! Error codes:
//! - SEAL_BUILD_ILLEGAL_STATE (ERROR)
//!
//! Raised when the write-once builder contract is broken. The builder is left
//! as it was before the failing call.

use std::fmt;

/// Misuse of `DocumentBuilder` or `DatabaseBuilder`
#[derive(Debug, Clone)]
pub struct BuildError {
    message: String,
    field: Option<String>,
}

impl BuildError {
    /// Create an illegal state error
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    /// Create an illegal state error about one field
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let f = field.into();
        Self {
            message: format!("field '{}': {}", f, message.into()),
            field: Some(f),
        }
    }

    pub fn payload_set_twice() -> Self {
        Self::illegal_state("payload already set")
    }

    pub fn missing_payload() -> Self {
        Self::illegal_state("document has no payload")
    }

    pub fn empty_field_name() -> Self {
        Self::illegal_state("empty field name")
    }

    pub fn too_many_documents(limit: usize) -> Self {
        Self::illegal_state(format!("database holds at most {} documents", limit))
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        "SEAL_BUILD_ILLEGAL_STATE"
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the field name if applicable
    pub fn field_name(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Build errors are never fatal
    pub fn is_fatal(&self) -> bool {
        false
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code(), self.message)
    }
}

impl std::error::Error for BuildError {}

/// Result type for builder operations
pub type BuildResult<T> = Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error() {
        let err = BuildError::field("price", "fixed length 8, got 4");
        assert_eq!(err.field_name(), Some("price"));
        assert_eq!(err.code(), "SEAL_BUILD_ILLEGAL_STATE");
        assert!(err.to_string().contains("price"));
        assert!(!err.is_fatal());
    }
}
