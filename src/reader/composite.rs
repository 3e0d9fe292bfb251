//! Several databases queried as one

use std::path::Path;
use std::sync::Arc;

use crate::bitset::QueryContext;
use crate::buffer::Buffer;
use crate::config::ReaderConfig;
use crate::errors::DbResult;
use crate::observability::MetricsRegistry;
use crate::query::{Pager, Query};

use super::database::Database;

/// An ordered list of databases
///
/// A query runs over each database in turn. Results of database `i` all
/// precede those of database `i + 1`; order-by applies within each
/// database. Skip and limit count across the concatenated stream.
#[derive(Debug, Default)]
pub struct CompositeDatabase {
    databases: Vec<Database>,
}

impl CompositeDatabase {
    pub fn new(databases: Vec<Database>) -> Self {
        Self { databases }
    }

    /// Opens every path in order, sharing one metrics registry
    pub fn open<P: AsRef<Path>>(paths: &[P], config: &ReaderConfig) -> DbResult<Self> {
        let metrics = Arc::new(MetricsRegistry::new());
        let databases = paths
            .iter()
            .map(|path| Database::open_with_metrics(path, config, Arc::clone(&metrics)))
            .collect::<DbResult<Vec<_>>>()?;
        Ok(Self::new(databases))
    }

    pub fn databases(&self) -> &[Database] {
        &self.databases
    }

    /// Database at `ordinal`
    pub fn get(&self, ordinal: usize) -> Option<&Database> {
        self.databases.get(ordinal)
    }

    pub fn len(&self) -> usize {
        self.databases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    /// Documents across all databases
    pub fn document_count(&self) -> usize {
        self.databases.iter().map(Database::document_count).sum()
    }

    /// Streams matches to `processor` as `(ordinal, document, payload)`.
    ///
    /// Returns the number of documents handed to the processor.
    pub fn execute(
        &self,
        context: &QueryContext,
        query: &Query,
        processor: &mut dyn FnMut(usize, usize, Buffer) -> bool,
    ) -> DbResult<usize> {
        let mut pager = Pager::new(query.skip(), query.limit());
        self.stream(context, query, &mut pager, processor)?;
        Ok(pager.emitted())
    }

    /// Like `execute`, but returns the number of matches across all
    /// databases before skip and limit were applied
    pub fn execute_and_unlimited_count(
        &self,
        context: &QueryContext,
        query: &Query,
        processor: &mut dyn FnMut(usize, usize, Buffer) -> bool,
    ) -> DbResult<usize> {
        let mut pager = Pager::new(query.skip(), query.limit());
        let (mut matched, streamed) = self.stream(context, query, &mut pager, processor)?;
        for db in &self.databases[streamed..] {
            matched += db.count(context, query)?;
        }
        Ok(matched)
    }

    /// Counts matches across all databases
    pub fn count(&self, context: &QueryContext, query: &Query) -> DbResult<usize> {
        self.databases
            .iter()
            .try_fold(0, |total, db| Ok(total + db.count(context, query)?))
    }

    /// Runs the query until the stream stops. Returns the matches seen and
    /// how many databases were visited.
    fn stream(
        &self,
        context: &QueryContext,
        query: &Query,
        pager: &mut Pager,
        processor: &mut dyn FnMut(usize, usize, Buffer) -> bool,
    ) -> DbResult<(usize, usize)> {
        let mut matched = 0;
        for (ordinal, db) in self.databases.iter().enumerate() {
            let mut forward = |document: usize, payload: Buffer| processor(ordinal, document, payload);
            let outcome = db.run(context, query, pager, Some(&mut forward))?;
            matched += outcome.matched;
            if !outcome.completed || pager.is_done() {
                return Ok((matched, ordinal + 1));
            }
        }
        Ok((matched, self.databases.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DatabaseBuilder, DocumentBuilder, IndexOption, LengthHint};
    use crate::query::{Condition, Order};

    fn database(values: &[i32]) -> Database {
        let mut builder = DatabaseBuilder::new();
        for value in values {
            let doc = DocumentBuilder::new()
                .with_field("n", *value, IndexOption::Full, LengthHint::Fixed)
                .unwrap()
                .with_payload(value.to_le_bytes().to_vec())
                .unwrap();
            builder.add(doc).unwrap();
        }
        let bytes = builder.seal().unwrap().to_bytes();
        Database::from_buffer(Buffer::from_vec(bytes), &ReaderConfig::default()).unwrap()
    }

    fn composite() -> CompositeDatabase {
        CompositeDatabase::new(vec![database(&[5, 1, 3]), database(&[]), database(&[4, 2])])
    }

    fn collect(db: &CompositeDatabase, query: &Query) -> Vec<(usize, usize)> {
        let context = QueryContext::new();
        let mut seen = Vec::new();
        db.execute(&context, query, &mut |ordinal, document, _payload| {
            seen.push((ordinal, document));
            true
        })
        .unwrap();
        seen
    }

    #[test]
    fn test_concatenates_in_database_order() {
        let db = composite();
        assert_eq!(db.len(), 3);
        assert_eq!(db.document_count(), 5);

        let query = Query::builder().order_by(Order::asc("n")).build().unwrap();
        assert_eq!(
            collect(&db, &query),
            vec![(0, 1), (0, 2), (0, 0), (2, 1), (2, 0)]
        );
    }

    #[test]
    fn test_pages_across_databases() {
        let db = composite();
        let query = Query::builder().skip(2).limit(2).build().unwrap();
        assert_eq!(collect(&db, &query), vec![(0, 2), (2, 0)]);

        let context = QueryContext::new();
        let total = db
            .execute_and_unlimited_count(&context, &query, &mut |_, _, _| true)
            .unwrap();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_count_sums() {
        let db = composite();
        let context = QueryContext::new();
        let query = Query::builder()
            .filter(Condition::gt("n", 2i32))
            .build()
            .unwrap();
        assert_eq!(db.count(&context, &query).unwrap(), 3);
    }

    #[test]
    fn test_processor_stop_ends_every_database() {
        let db = composite();
        let context = QueryContext::new();
        let mut calls = 0;
        let returned = db
            .execute(&context, &Query::all(), &mut |_, _, _| {
                calls += 1;
                false
            })
            .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(returned, 1);
    }
}
