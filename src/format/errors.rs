//! Format error types
//!
//! Error codes:
//! - SEAL_FORMAT_BAD_MAGIC (FATAL)
//! - SEAL_FORMAT_UNSUPPORTED_VERSION (FATAL)
//! - SEAL_FORMAT_DIGEST_MISMATCH (FATAL)
//! - SEAL_FORMAT_TRUNCATED (FATAL)
//! - SEAL_FORMAT_UNKNOWN_SEGMENT (FATAL)
//! - SEAL_FORMAT_CORRUPT (FATAL)
//!
//! A format error means the byte source cannot be opened. It is never
//! retried and no partial database is produced.

use std::fmt;

use crate::errors::Severity;

/// Format-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatErrorCode {
    /// Leading magic constant does not match
    SealFormatBadMagic,
    /// Format version differs from the supported one
    SealFormatUnsupportedVersion,
    /// Stored digest differs from the recomputed one
    SealFormatDigestMismatch,
    /// Byte source ends before a structure does
    SealFormatTruncated,
    /// Segment type code not in the registry
    SealFormatUnknownSegment,
    /// Structurally invalid content
    SealFormatCorrupt,
}

impl FormatErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            FormatErrorCode::SealFormatBadMagic => "SEAL_FORMAT_BAD_MAGIC",
            FormatErrorCode::SealFormatUnsupportedVersion => "SEAL_FORMAT_UNSUPPORTED_VERSION",
            FormatErrorCode::SealFormatDigestMismatch => "SEAL_FORMAT_DIGEST_MISMATCH",
            FormatErrorCode::SealFormatTruncated => "SEAL_FORMAT_TRUNCATED",
            FormatErrorCode::SealFormatUnknownSegment => "SEAL_FORMAT_UNKNOWN_SEGMENT",
            FormatErrorCode::SealFormatCorrupt => "SEAL_FORMAT_CORRUPT",
        }
    }

    /// Format errors are always fatal
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl fmt::Display for FormatErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Format error with context
#[derive(Debug, Clone)]
pub struct FormatError {
    code: FormatErrorCode,
    message: String,
    details: Option<String>,
}

impl FormatError {
    fn new(code: FormatErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_magic(found: u32) -> Self {
        Self::new(FormatErrorCode::SealFormatBadMagic, "not a sealed database")
            .with_details(format!("magic: {:#010x}", found))
    }

    pub fn unsupported_version(found: u32, supported: u32) -> Self {
        Self::new(
            FormatErrorCode::SealFormatUnsupportedVersion,
            format!("format version {} is not supported", found),
        )
        .with_details(format!("supported: {}", supported))
    }

    pub fn digest_mismatch() -> Self {
        Self::new(
            FormatErrorCode::SealFormatDigestMismatch,
            "stored digest does not match content",
        )
    }

    /// Truncation detected at `offset` within the structure being decoded
    pub fn truncated(offset: usize, what: impl Into<String>) -> Self {
        Self::new(FormatErrorCode::SealFormatTruncated, what)
            .with_details(format!("byte_offset: {}", offset))
    }

    pub fn unknown_segment(code: u32) -> Self {
        Self::new(
            FormatErrorCode::SealFormatUnknownSegment,
            format!("unknown segment type code {}", code),
        )
    }

    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::new(FormatErrorCode::SealFormatCorrupt, reason)
    }

    /// Returns the error code
    pub fn code(&self) -> FormatErrorCode {
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

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for FormatError {}

/// Result type for decoding
pub type FormatResult<T> = Result<T, FormatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(FormatErrorCode::SealFormatBadMagic.code(), "SEAL_FORMAT_BAD_MAGIC");
        assert_eq!(
            FormatErrorCode::SealFormatUnsupportedVersion.code(),
            "SEAL_FORMAT_UNSUPPORTED_VERSION"
        );
        assert_eq!(
            FormatErrorCode::SealFormatDigestMismatch.code(),
            "SEAL_FORMAT_DIGEST_MISMATCH"
        );
        assert_eq!(FormatErrorCode::SealFormatTruncated.code(), "SEAL_FORMAT_TRUNCATED");
        assert_eq!(
            FormatErrorCode::SealFormatUnknownSegment.code(),
            "SEAL_FORMAT_UNKNOWN_SEGMENT"
        );
        assert_eq!(FormatErrorCode::SealFormatCorrupt.code(), "SEAL_FORMAT_CORRUPT");
    }

    #[test]
    fn test_always_fatal() {
        assert!(FormatError::digest_mismatch().is_fatal());
        assert!(FormatError::corrupt("bad offsets").is_fatal());
    }

    #[test]
    fn test_display_contains_details() {
        let err = FormatError::bad_magic(0x1234);
        let display = err.to_string();
        assert!(display.contains("[FATAL] SEAL_FORMAT_BAD_MAGIC"));
        assert!(display.contains("0x00001234"));
    }
}
