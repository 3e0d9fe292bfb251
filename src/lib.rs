//! sealdb - An embedded, immutable, memory-mappable document database
//!
//! Documents are accumulated once, sealed and serialized into a single
//! binary blob, then opened read-only for filtering, sorting and retrieval.
//!
//! # Layers
//!
//! - `buffer`: byte source over heap memory or a memory-mapped file
//! - `bitset`: document bit sets and the scratch bit-set pool
//! - `dictionary`: ordered byte-string dictionaries (flat and trie)
//! - `multimap`: dictionary index → document ids, list or bit-set encoded
//! - `index`: filterable and sortable field indexes
//! - `format`: file header, segment registry, payload segment, digest
//! - `builder`: write side (documents → sealed database → bytes)
//! - `reader`: read side (bytes → database, composite databases)
//! - `query`: conditions, queries and the execution engine

pub mod bitset;
pub mod buffer;
pub mod builder;
pub mod config;
pub mod dictionary;
pub mod errors;
pub mod format;
pub mod index;
pub mod multimap;
pub mod observability;
pub mod query;
pub mod reader;

pub use bitset::{ArrayBitSet, BitSet, OneBitSet, QueryContext, ZeroBitSet};
pub use buffer::Buffer;
pub use builder::{DatabaseBuilder, DocumentBuilder, IndexOption, LengthHint, SealedDatabase};
pub use config::ReaderConfig;
pub use errors::{DbError, DbResult, Severity};
pub use index::FieldValue;
pub use observability::MetricsRegistry;
pub use query::{Condition, DocumentProcessor, Order, Query, QueryBuilder};
pub use reader::{CompositeDatabase, Database};
