//! Crate-wide error umbrella
//!
//! Every subsystem owns an error type with a stable string code and a
//! severity:
//! - `FormatError` (FATAL): bad magic, unsupported version, digest mismatch,
//!   truncation, unknown segment
//! - `PoolError` (FATAL): scratch quota exhausted, pool misuse
//! - `QueryError` (ERROR): malformed query rejected before execution
//! - `BuildError` (ERROR): misuse of the write-once builder contract
//! - `ConfigError` (ERROR): invalid reader configuration
//!
//! `DbError` wraps them for entry points that cross subsystems.

use std::fmt;

use thiserror::Error;

use crate::bitset::PoolError;
use crate::builder::BuildError;
use crate::config::ConfigError;
use crate::format::FormatError;
use crate::query::QueryError;

/// Severity levels shared by all subsystem errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed, the database stays usable
    Error,
    /// Operation aborted, the input or configuration is unusable
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Umbrella error for operations that touch several subsystems
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DbError {
    /// Stable error code of the wrapped error
    pub fn code(&self) -> &'static str {
        match self {
            DbError::Format(e) => e.code().code(),
            DbError::Pool(e) => e.code().code(),
            DbError::Query(e) => e.code(),
            DbError::Build(e) => e.code(),
            DbError::Config(e) => e.code(),
            DbError::Io(_) => "SEAL_IO_ERROR",
        }
    }

    /// Severity of the wrapped error; I/O failures are fatal to the operation
    pub fn severity(&self) -> Severity {
        match self {
            DbError::Format(e) => e.severity(),
            DbError::Pool(e) => e.severity(),
            DbError::Query(_) | DbError::Build(_) | DbError::Config(_) => Severity::Error,
            DbError::Io(_) => Severity::Fatal,
        }
    }

    /// Returns whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// Result type for cross-subsystem operations
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_is_fatal() {
        let err: DbError = FormatError::bad_magic(0xDEAD_BEEF).into();
        assert!(err.is_fatal());
        assert_eq!(err.code(), "SEAL_FORMAT_BAD_MAGIC");
    }

    #[test]
    fn test_query_error_not_fatal() {
        let err: DbError = QueryError::invalid("empty field name").into();
        assert!(!err.is_fatal());
        assert_eq!(err.code(), "SEAL_QUERY_INVALID");
    }

    #[test]
    fn test_display_is_transparent() {
        let err: DbError = FormatError::truncated(3, "file shorter than header").into();
        let display = err.to_string();
        assert!(display.contains("FATAL"));
        assert!(display.contains("SEAL_FORMAT_TRUNCATED"));
    }
}
