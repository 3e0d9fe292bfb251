//! Observable events
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events of a sealed database's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Reader
    /// Database opened and all segments decoded
    DbOpen,
    /// Opening a database failed
    DbOpenFailed,
    /// Stored digest did not match the body
    DigestMismatch,

    // Builder
    /// Builder sealed into an immutable database
    DbSealed,
    /// Sealed database serialized
    DbWritten,

    // Query
    /// Query executed
    QueryExecuted,
    /// Scratch quota exceeded
    PoolExhausted,

    // Configuration
    /// Reader configuration loaded from a file
    ConfigLoaded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::DbOpen => "DB_OPEN",
            Event::DbOpenFailed => "DB_OPEN_FAILED",
            Event::DigestMismatch => "DIGEST_MISMATCH",
            Event::DbSealed => "DB_SEALED",
            Event::DbWritten => "DB_WRITTEN",
            Event::QueryExecuted => "QUERY_EXECUTED",
            Event::PoolExhausted => "POOL_EXHAUSTED",
            Event::ConfigLoaded => "CONFIG_LOADED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::DigestMismatch | Event::DbOpenFailed)
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::DigestMismatch | Event::DbOpenFailed => Severity::Fatal,
            Event::PoolExhausted => Severity::Error,
            Event::QueryExecuted => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::DbOpen,
            Event::DbOpenFailed,
            Event::DigestMismatch,
            Event::DbSealed,
            Event::DbWritten,
            Event::QueryExecuted,
            Event::PoolExhausted,
            Event::ConfigLoaded,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::DigestMismatch.is_fatal());
        assert!(Event::DbOpenFailed.is_fatal());
        assert!(!Event::DbOpen.is_fatal());
        assert_eq!(Event::DigestMismatch.severity(), Severity::Fatal);
        assert_eq!(Event::QueryExecuted.severity(), Severity::Trace);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::DbSealed), "DB_SEALED");
    }
}
