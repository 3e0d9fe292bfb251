//! Read side of one sealed database
//!
//! Open sequence:
//! 1. Validate the reader configuration
//! 2. Check header and digest (`format::open_body`)
//! 3. Split the body into typed segments
//! 4. Decode the payload segment, which fixes the document count
//! 5. Decode every index segment against that count
//!
//! Any failure aborts the open. No partially opened database is returned.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::bitset::{BitSetPool, PoolError, PoolErrorCode, PoolResult, QueryContext};
use crate::buffer::Buffer;
use crate::config::ReaderConfig;
use crate::errors::{DbError, DbResult};
use crate::format::{
    open_body, split_segments, FormatError, FormatErrorCode, PayloadSegment, Segment, SegmentType,
};
use crate::index::{FilterableIndex, SortableIndex};
use crate::observability::{
    log_event_with_fields, Event, MetricsRegistry, ObservationScope, Timer,
};
use crate::query::{DocumentProcessor, Executor, Pager, Query, QuerySource};

/// Scope around an open. Its `DB_LOAD_*` lines stay distinct from the
/// `DB_OPEN` and `DB_OPEN_FAILED` events.
const LOAD_SCOPE: &str = "DB_LOAD";

/// What one run of a query produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunOutcome {
    /// Documents matching the filter, before skip and limit
    pub matched: usize,
    /// False if the processor or the limit ended the stream
    pub completed: bool,
}

/// An opened, immutable database
///
/// Shareable across threads. Each thread runs queries through its own
/// `QueryContext`.
#[derive(Debug)]
pub struct Database {
    bytes: Buffer,
    payload: PayloadSegment,
    filters: HashMap<String, FilterableIndex>,
    sorters: HashMap<String, SortableIndex>,
    pool: Arc<BitSetPool>,
    max_sets_per_query: usize,
    metrics: Arc<MetricsRegistry>,
}

impl Database {
    /// Opens a database file, mapped or loaded per `config`
    pub fn open(path: impl AsRef<Path>, config: &ReaderConfig) -> DbResult<Self> {
        Self::open_with_metrics(path, config, Arc::new(MetricsRegistry::new()))
    }

    /// Opens a database file, recording into a shared registry
    pub fn open_with_metrics(
        path: impl AsRef<Path>,
        config: &ReaderConfig,
        metrics: Arc<MetricsRegistry>,
    ) -> DbResult<Self> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        Self::observe_open(&origin, &metrics, || {
            config.validate()?;
            let bytes = if config.load_into_memory {
                Buffer::read_file(path)?
            } else {
                Buffer::map_file(path)?
            };
            Self::decode(bytes, config, Arc::clone(&metrics))
        })
    }

    /// Opens a database held in memory
    pub fn from_buffer(bytes: Buffer, config: &ReaderConfig) -> DbResult<Self> {
        Self::from_buffer_with_metrics(bytes, config, Arc::new(MetricsRegistry::new()))
    }

    pub fn from_buffer_with_metrics(
        bytes: Buffer,
        config: &ReaderConfig,
        metrics: Arc<MetricsRegistry>,
    ) -> DbResult<Self> {
        Self::observe_open("<memory>", &metrics, || {
            config.validate()?;
            Self::decode(bytes, config, Arc::clone(&metrics))
        })
    }

    fn observe_open<F>(origin: &str, metrics: &MetricsRegistry, open: F) -> DbResult<Self>
    where
        F: FnOnce() -> DbResult<Self>,
    {
        let scope = ObservationScope::with_fields(LOAD_SCOPE, &[("path", origin)]);
        match open() {
            Ok(db) => {
                metrics.record_open(db.size_in_bytes() as u64);
                let documents = db.document_count().to_string();
                let bytes = db.size_in_bytes().to_string();
                let filters = db.filters.len().to_string();
                let sorters = db.sorters.len().to_string();
                log_event_with_fields(
                    Event::DbOpen,
                    &[
                        ("path", origin),
                        ("documents", documents.as_str()),
                        ("bytes", bytes.as_str()),
                        ("filterable", filters.as_str()),
                        ("sortable", sorters.as_str()),
                        ("mapped", if db.is_mapped() { "true" } else { "false" }),
                    ],
                );
                scope.complete();
                Ok(db)
            }
            Err(err) => {
                metrics.increment_open_failures();
                if let DbError::Format(format) = &err {
                    if format.code() == FormatErrorCode::SealFormatDigestMismatch {
                        log_event_with_fields(Event::DigestMismatch, &[("path", origin)]);
                    }
                }
                let reason = err.to_string();
                log_event_with_fields(
                    Event::DbOpenFailed,
                    &[("path", origin), ("code", err.code()), ("reason", reason.as_str())],
                );
                scope.fail_fatal(&reason);
                Err(err)
            }
        }
    }

    fn decode(bytes: Buffer, config: &ReaderConfig, metrics: Arc<MetricsRegistry>) -> DbResult<Self> {
        let body = open_body(&bytes, config.verify_digest)?;
        let segments = split_segments(&body)?;

        let mut payloads = segments.iter().filter(|s| s.kind == SegmentType::Payload);
        let first = payloads
            .next()
            .ok_or_else(|| FormatError::corrupt("missing payload segment"))?;
        if let Some(extra) = payloads.next() {
            return Err(FormatError::corrupt(format!(
                "duplicate payload segment at offset {}",
                extra.offset
            ))
            .into());
        }
        let payload = match first.decode(0)? {
            Segment::Payload(payload) => payload,
            _ => return Err(FormatError::corrupt("payload segment decoded as index").into()),
        };
        let documents = payload.document_count();

        let mut filters = HashMap::new();
        let mut sorters = HashMap::new();
        for raw in segments.iter().filter(|s| s.kind != SegmentType::Payload) {
            match raw.decode(documents)? {
                Segment::Filter(filter) => insert_unique(&mut filters, filter, "filterable")?,
                Segment::Sorter(sorter) => insert_unique(&mut sorters, sorter, "sortable")?,
                Segment::Full(filter, sorter) => {
                    insert_unique(&mut filters, filter, "filterable")?;
                    insert_unique(&mut sorters, sorter, "sortable")?;
                }
                Segment::Payload(_) => {}
            }
        }

        Ok(Self {
            bytes,
            payload,
            filters,
            sorters,
            pool: Arc::new(BitSetPool::new(documents, config.max_concurrent_sets)),
            max_sets_per_query: config.max_sets_per_query,
            metrics,
        })
    }

    /// Documents in the database
    pub fn document_count(&self) -> usize {
        self.payload.document_count()
    }

    /// Payload of `document`, or None if out of range
    pub fn payload(&self, document: usize) -> Option<Buffer> {
        self.payload.get(document)
    }

    /// Size of the underlying byte source
    pub fn size_in_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the bytes are memory mapped rather than loaded
    pub fn is_mapped(&self) -> bool {
        self.bytes.is_mapped()
    }

    /// Names of filterable fields, sorted
    pub fn filterable_fields(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Names of sortable fields, sorted
    pub fn sortable_fields(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sorters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Process-wide scratch pool of this database
    pub fn pool(&self) -> &BitSetPool {
        &self.pool
    }

    /// Streams matching documents to `processor` in query order.
    ///
    /// Returns the number of documents handed to the processor.
    pub fn execute(
        &self,
        context: &QueryContext,
        query: &Query,
        processor: &mut dyn DocumentProcessor,
    ) -> DbResult<usize> {
        let mut pager = Pager::new(query.skip(), query.limit());
        self.run(context, query, &mut pager, Some(processor))?;
        Ok(pager.emitted())
    }

    /// Like `execute`, but returns the number of matches before skip and
    /// limit were applied
    pub fn execute_and_unlimited_count(
        &self,
        context: &QueryContext,
        query: &Query,
        processor: &mut dyn DocumentProcessor,
    ) -> DbResult<usize> {
        let mut pager = Pager::new(query.skip(), query.limit());
        Ok(self.run(context, query, &mut pager, Some(processor))?.matched)
    }

    /// Counts matching documents; ordering, skip and limit are ignored
    pub fn count(&self, context: &QueryContext, query: &Query) -> DbResult<usize> {
        let mut pager = Pager::new(0, None);
        Ok(self.run(context, query, &mut pager, None)?.matched)
    }

    /// Runs `query` against a pager that may be shared with other databases.
    /// Without a processor only the filter is evaluated.
    pub(crate) fn run(
        &self,
        context: &QueryContext,
        query: &Query,
        pager: &mut Pager,
        processor: Option<&mut dyn DocumentProcessor>,
    ) -> DbResult<RunOutcome> {
        let timer = Timer::new();
        let before = pager.emitted();
        let scratch = context
            .scratch(&self.pool, self.max_sets_per_query)
            .map_err(|e| self.pool_failure(e))?;
        let mut executor = Executor::new(self, scratch);

        let outcome = (|| -> PoolResult<RunOutcome> {
            let selection = executor.select(query.conditions())?;
            let matched = selection.cardinality();
            let completed = match processor {
                Some(processor) => executor.emit(&selection, query.orders(), pager, processor)?,
                None => true,
            };
            executor.recycle(selection)?;
            Ok(RunOutcome { matched, completed })
        })();
        let borrowed = executor.finish();

        let (outcome, borrowed) = match (outcome, borrowed) {
            (Ok(outcome), Ok(borrowed)) => (outcome, borrowed),
            (Err(e), _) | (Ok(_), Err(e)) => return Err(self.pool_failure(e)),
        };

        let returned = pager.emitted() - before;
        self.metrics.increment_queries_executed();
        self.metrics.add_documents_returned(returned as u64);
        self.metrics.add_sets_borrowed(borrowed as u64);

        let matched = outcome.matched.to_string();
        let returned = returned.to_string();
        let borrowed = borrowed.to_string();
        let elapsed = timer.elapsed_ms();
        log_event_with_fields(
            Event::QueryExecuted,
            &[
                ("matched", matched.as_str()),
                ("returned", returned.as_str()),
                ("sets_borrowed", borrowed.as_str()),
                ("duration_ms", elapsed.as_str()),
            ],
        );
        Ok(outcome)
    }

    fn pool_failure(&self, err: PoolError) -> DbError {
        if err.code() == PoolErrorCode::SealPoolExhausted {
            self.metrics.increment_pool_exhaustions();
            let reason = err.to_string();
            log_event_with_fields(Event::PoolExhausted, &[("reason", reason.as_str())]);
        }
        err.into()
    }
}

impl QuerySource for Database {
    fn document_count(&self) -> usize {
        self.payload.document_count()
    }

    fn filterable(&self, field: &str) -> Option<&FilterableIndex> {
        self.filters.get(field)
    }

    fn sortable(&self, field: &str) -> Option<&SortableIndex> {
        self.sorters.get(field)
    }

    fn payload(&self, document: usize) -> Option<Buffer> {
        self.payload.get(document)
    }
}

trait Named {
    fn index_name(&self) -> &str;
}

impl Named for FilterableIndex {
    fn index_name(&self) -> &str {
        self.name()
    }
}

impl Named for SortableIndex {
    fn index_name(&self) -> &str {
        self.name()
    }
}

fn insert_unique<T: Named>(
    indexes: &mut HashMap<String, T>,
    index: T,
    what: &str,
) -> Result<(), FormatError> {
    let name = index.index_name().to_string();
    if indexes.contains_key(&name) {
        return Err(FormatError::corrupt(format!(
            "duplicate {} index '{}'",
            what, name
        )));
    }
    indexes.insert(name, index);
    Ok(())
}
