//! Scratch pool error types
//!
//! Error codes:
//! - SEAL_POOL_EXHAUSTED (FATAL)
//! - SEAL_POOL_RELEASED (FATAL)
//! - SEAL_POOL_DOUBLE_RELEASE (FATAL)
//! - SEAL_POOL_CONTEXT_BUSY (FATAL)
//! - SEAL_POOL_SIZE_MISMATCH (FATAL)
//! - SEAL_POOL_NOT_BORROWED (FATAL)

use std::fmt;

use crate::errors::Severity;

/// Pool-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolErrorCode {
    /// Per-query or process-wide quota reached
    SealPoolExhausted,
    /// Borrow from a scratch pool that was already released
    SealPoolReleased,
    /// Scratch pool released twice
    SealPoolDoubleRelease,
    /// Query context already serving a query
    SealPoolContextBusy,
    /// Bit set returned to a pool of a different size
    SealPoolSizeMismatch,
    /// Bit set given back with nothing outstanding
    SealPoolNotBorrowed,
}

impl PoolErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PoolErrorCode::SealPoolExhausted => "SEAL_POOL_EXHAUSTED",
            PoolErrorCode::SealPoolReleased => "SEAL_POOL_RELEASED",
            PoolErrorCode::SealPoolDoubleRelease => "SEAL_POOL_DOUBLE_RELEASE",
            PoolErrorCode::SealPoolContextBusy => "SEAL_POOL_CONTEXT_BUSY",
            PoolErrorCode::SealPoolSizeMismatch => "SEAL_POOL_SIZE_MISMATCH",
            PoolErrorCode::SealPoolNotBorrowed => "SEAL_POOL_NOT_BORROWED",
        }
    }

    /// Every pool error is a programming or configuration error
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl fmt::Display for PoolErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Pool error with context
#[derive(Debug, Clone)]
pub struct PoolError {
    code: PoolErrorCode,
    message: String,
}

impl PoolError {
    /// Quota reached; `limit` is the quota that refused the borrow
    pub fn exhausted(scope: &str, limit: usize) -> Self {
        Self {
            code: PoolErrorCode::SealPoolExhausted,
            message: format!("{} quota of {} scratch sets reached", scope, limit),
        }
    }

    /// Borrow after release
    pub fn released() -> Self {
        Self {
            code: PoolErrorCode::SealPoolReleased,
            message: "scratch pool used after release".to_string(),
        }
    }

    /// Second release of the same scratch pool
    pub fn double_release() -> Self {
        Self {
            code: PoolErrorCode::SealPoolDoubleRelease,
            message: "scratch pool released twice".to_string(),
        }
    }

    /// Nested query on a busy context
    pub fn context_busy() -> Self {
        Self {
            code: PoolErrorCode::SealPoolContextBusy,
            message: "query context already runs a query; use a second context".to_string(),
        }
    }

    /// Returned set does not match the pool's bit-set size
    pub fn size_mismatch(expected: usize, actual: usize) -> Self {
        Self {
            code: PoolErrorCode::SealPoolSizeMismatch,
            message: format!("expected bit set of size {}, got {}", expected, actual),
        }
    }

    /// Give back on a scratch pool with no outstanding sets
    pub fn not_borrowed() -> Self {
        Self {
            code: PoolErrorCode::SealPoolNotBorrowed,
            message: "bit set given back but none is outstanding".to_string(),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> PoolErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for PoolError {}

/// Result type for pool operations
pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(PoolErrorCode::SealPoolExhausted.code(), "SEAL_POOL_EXHAUSTED");
        assert_eq!(PoolErrorCode::SealPoolReleased.code(), "SEAL_POOL_RELEASED");
        assert_eq!(PoolErrorCode::SealPoolDoubleRelease.code(), "SEAL_POOL_DOUBLE_RELEASE");
        assert_eq!(PoolErrorCode::SealPoolContextBusy.code(), "SEAL_POOL_CONTEXT_BUSY");
        assert_eq!(PoolErrorCode::SealPoolSizeMismatch.code(), "SEAL_POOL_SIZE_MISMATCH");
        assert_eq!(PoolErrorCode::SealPoolNotBorrowed.code(), "SEAL_POOL_NOT_BORROWED");
    }

    #[test]
    fn test_all_fatal() {
        assert!(PoolError::exhausted("query", 2).is_fatal());
        assert!(PoolError::context_busy().is_fatal());
    }

    #[test]
    fn test_display() {
        let display = PoolError::exhausted("query", 16).to_string();
        assert!(display.contains("[FATAL] SEAL_POOL_EXHAUSTED"));
        assert!(display.contains("16"));
    }
}
