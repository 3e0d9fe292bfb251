//! Begin/complete logging around one operation
//!
//! - `{name}_BEGIN` when the scope opens
//! - `{name}_COMPLETE` or `{name}_FAILED` when it closes, with `duration_ms`
//! - `{name}_FAILED` at WARN if the scope is dropped while still open

use std::time::Instant;

use super::logger::{Logger, Severity};

/// Logs the lifetime of an open, seal or write
///
/// ```ignore
/// let scope = ObservationScope::with_fields("DB_LOAD", &[("path", "/data/db.seal")]);
/// let db = decode(bytes)?;
/// scope.complete_with_fields(&[("documents", "42")]);
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    fields: Vec<(&'a str, String)>,
    timer: Timer,
    open: bool,
}

impl<'a> ObservationScope<'a> {
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Opens a scope whose fields repeat on every line it logs
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        let scope = Self {
            name,
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            timer: Timer::new(),
            open: true,
        };
        Logger::info(&format!("{}_BEGIN", name), fields);
        scope
    }

    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Closes the scope at INFO with extra fields
    pub fn complete_with_fields(mut self, extra: &[(&str, &str)]) {
        self.close(Severity::Info, "COMPLETE", extra);
    }

    /// Closes the scope at ERROR
    pub fn fail(mut self, reason: &str) {
        self.close(Severity::Error, "FAILED", &[("reason", reason)]);
    }

    /// Closes the scope at FATAL
    pub fn fail_fatal(mut self, reason: &str) {
        self.close(Severity::Fatal, "FAILED", &[("reason", reason)]);
    }

    /// Returns true once the scope has been closed
    pub fn is_completed(&self) -> bool {
        !self.open
    }

    fn close(&mut self, severity: Severity, outcome: &str, extra: &[(&str, &str)]) {
        self.open = false;
        let elapsed = self.timer.elapsed_ms();
        let mut fields: Vec<(&str, &str)> = self
            .fields
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .chain(extra.iter().copied())
            .collect();
        fields.push(("duration_ms", elapsed.as_str()));
        Logger::log(severity, &format!("{}_{}", self.name, outcome), &fields);
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if self.open {
            self.close(
                Severity::Warn,
                "FAILED",
                &[("reason", "scope dropped while open")],
            );
        }
    }
}

/// Wall-clock stopwatch
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed whole milliseconds, formatted for a log field
    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
