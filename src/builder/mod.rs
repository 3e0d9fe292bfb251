//! Write side
//!
//! ```ignore
//! let mut builder = DatabaseBuilder::new();
//! builder.add(
//!     DocumentBuilder::new()
//!         .with_field("text", "doc1234", IndexOption::Full, LengthHint::Variable)?
//!         .with_payload(b"payload1".to_vec())?,
//! )?;
//! let sealed = builder.seal()?;
//! sealed.write_file("db.seal")?;
//! ```
//!
//! A builder is used once: documents are added, the builder is sealed, and
//! the sealed form is written.

mod database;
mod document;
mod errors;

pub use database::{DatabaseBuilder, SealedDatabase, MAX_DOCUMENTS};
pub use document::DocumentBuilder;
pub use errors::{BuildError, BuildResult};

/// Which indexes a field gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexOption {
    /// Equality, membership and range filters
    Filterable,
    /// Ordering only
    Sortable,
    /// Filters and ordering over one shared dictionary
    Full,
    /// Filters over a prefix-compressed dictionary
    TrieFilterable,
}

impl IndexOption {
    pub fn is_sortable(&self) -> bool {
        matches!(self, IndexOption::Sortable | IndexOption::Full)
    }
}

/// Dictionary layout for a field's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthHint {
    /// Every value has the same encoded length
    Fixed,
    /// Values differ in length
    Variable,
}
