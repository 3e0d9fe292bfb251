//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one process or one group of databases
///
/// All counters use Relaxed atomics; readers see exact totals once writers
/// are quiescent.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Databases opened successfully
    databases_opened: AtomicU64,
    /// Failed opens
    open_failures: AtomicU64,
    /// Bytes of all successfully opened databases
    bytes_opened: AtomicU64,
    /// Queries executed (including counts)
    queries_executed: AtomicU64,
    /// Documents handed to processors
    documents_returned: AtomicU64,
    /// Scratch bit sets borrowed
    sets_borrowed: AtomicU64,
    /// Borrow attempts rejected by a quota
    pool_exhaustions: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful open of `bytes` bytes
    pub fn record_open(&self, bytes: u64) {
        self.databases_opened.fetch_add(1, Ordering::Relaxed);
        self.bytes_opened.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_open_failures(&self) {
        self.open_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a query, whether it streamed or only counted
    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// Add documents handed to a processor
    pub fn add_documents_returned(&self, count: u64) {
        self.documents_returned.fetch_add(count, Ordering::Relaxed);
    }

    /// Add scratch sets borrowed by a query
    pub fn add_sets_borrowed(&self, count: u64) {
        self.sets_borrowed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_pool_exhaustions(&self) {
        self.pool_exhaustions.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot rendered as one JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_default()
    }

    /// Current value of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            databases_opened: self.databases_opened.load(Ordering::Relaxed),
            open_failures: self.open_failures.load(Ordering::Relaxed),
            bytes_opened: self.bytes_opened.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            documents_returned: self.documents_returned.load(Ordering::Relaxed),
            sets_borrowed: self.sets_borrowed.load(Ordering::Relaxed),
            pool_exhaustions: self.pool_exhaustions.load(Ordering::Relaxed),
        }
    }
}

/// Counter values at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub databases_opened: u64,
    pub open_failures: u64,
    pub bytes_opened: u64,
    pub queries_executed: u64,
    pub documents_returned: u64,
    pub sets_borrowed: u64,
    pub pool_exhaustions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let registry = MetricsRegistry::new();
        assert_eq!(registry.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_increment_counters() {
        let registry = MetricsRegistry::new();

        registry.record_open(100);
        registry.record_open(50);
        registry.increment_open_failures();
        registry.increment_queries_executed();
        registry.add_documents_returned(7);
        registry.add_sets_borrowed(3);
        registry.increment_pool_exhaustions();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.databases_opened, 2);
        assert_eq!(snapshot.bytes_opened, 150);
        assert_eq!(snapshot.open_failures, 1);
        assert_eq!(snapshot.queries_executed, 1);
        assert_eq!(snapshot.documents_returned, 7);
        assert_eq!(snapshot.sets_borrowed, 3);
        assert_eq!(snapshot.pool_exhaustions, 1);
    }

    #[test]
    fn test_to_json() {
        let registry = MetricsRegistry::new();
        registry.record_open(1234);
        registry.increment_queries_executed();

        let parsed: serde_json::Value = serde_json::from_str(&registry.to_json()).unwrap();
        assert_eq!(parsed["bytes_opened"], 1234);
        assert_eq!(parsed["queries_executed"], 1);
        assert_eq!(parsed["pool_exhaustions"], 0);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let reg = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    reg.increment_queries_executed();
                    reg.add_documents_returned(2);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.queries_executed, 1000);
        assert_eq!(snapshot.documents_returned, 2000);
    }
}
