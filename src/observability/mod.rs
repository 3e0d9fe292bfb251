//! Observability subsystem
//!
//! - Structured logging (JSON, one line per event)
//! - Atomic counters
//! - Begin/complete scopes around open and serialization
//!
//! Observability is read-only: nothing here changes what a query returns,
//! and no call spawns threads or blocks on I/O other than the log write.
//!
//! # Usage
//!
//! ```ignore
//! use sealdb::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::DbOpen, &[("documents", "42")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_queries_executed();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::{ObservationScope, Timer};

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
