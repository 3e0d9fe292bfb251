//! Field indexes
//!
//! - `FieldValue`: typed values with order-preserving byte encodings
//! - `FilterableIndex`: equality, membership and range predicates → bit sets.
//!   The trie-backed variant is the same type over a trie dictionary.
//! - `SortableIndex`: document ↔ rank mapping for ordered traversal
//!
//! A full index is a filterable and a sortable index sharing one dictionary.

mod filter;
mod sort;
mod value;

pub use filter::FilterableIndex;
pub use sort::{RankGroups, SortableIndex, NO_RANK};
pub use value::FieldValue;
