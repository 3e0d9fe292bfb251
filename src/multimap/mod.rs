//! Value→document multimaps
//!
//! A multimap relates each dictionary index (key) in `[0, keys_count)` to the
//! documents holding that value. Two encodings are interchangeable:
//!
//! ```text
//! list   (tag 1): [u32 keys][(keys + 1) × u32 offsets][u32 document ids]
//! bitset (tag 2): [u32 keys][u32 words_per_key][keys × words_per_key × u64]
//! ```
//!
//! The builder writes whichever is smaller. Lookups OR matching documents
//! into a caller-supplied bit set and return whether anything matched. On a
//! `false` return the destination is left exactly as it was, so callers must
//! check the return value rather than assume a cleared set.

mod bits;
mod builder;
mod list;

pub use bits::BitSetMultiMap;
pub use builder::{Encoding, MultiMapBuilder};
pub use list::ListMultiMap;

use crate::bitset::{ArrayBitSet, BitSet};
use crate::buffer::Buffer;
use crate::format::codec::take_u32;
use crate::format::{FormatError, FormatResult};

/// Tag of the list encoding
pub const TAG_LIST: u32 = 1;
/// Tag of the bit-set encoding
pub const TAG_BITSET: u32 = 2;

/// Any decoded multimap
#[derive(Debug, Clone)]
pub enum MultiMap {
    List(ListMultiMap),
    BitSet(BitSetMultiMap),
}

impl MultiMap {
    /// Decodes a multimap at the cursor, tag included. Document ids are
    /// checked against `documents`.
    pub fn decode(buffer: &mut Buffer, documents: usize) -> FormatResult<Self> {
        let at = buffer.position();
        match take_u32(buffer, "multimap tag")? as u32 {
            TAG_LIST => ListMultiMap::decode(buffer, documents).map(MultiMap::List),
            TAG_BITSET => BitSetMultiMap::decode(buffer, documents).map(MultiMap::BitSet),
            other => Err(FormatError::corrupt(format!(
                "unknown multimap tag {} at byte {}",
                other, at
            ))),
        }
    }

    /// Number of keys
    pub fn keys_count(&self) -> usize {
        match self {
            MultiMap::List(m) => m.keys_count(),
            MultiMap::BitSet(m) => m.keys_count(),
        }
    }

    /// Encoding of this multimap
    pub fn encoding(&self) -> Encoding {
        match self {
            MultiMap::List(_) => Encoding::List,
            MultiMap::BitSet(_) => Encoding::BitSet,
        }
    }

    /// ORs the documents of `key` into `dest`.
    ///
    /// Returns false, leaving `dest` untouched, if `key` has no documents.
    pub fn get(&self, dest: &mut ArrayBitSet, key: usize) -> bool {
        self.get_between(dest, key, key)
    }

    /// ORs the documents of keys `from..` into `dest`
    pub fn get_from(&self, dest: &mut ArrayBitSet, from: usize) -> bool {
        match self.keys_count().checked_sub(1) {
            Some(last) => self.get_between(dest, from, last),
            None => false,
        }
    }

    /// ORs the documents of keys `..=to` into `dest`
    pub fn get_to(&self, dest: &mut ArrayBitSet, to: usize) -> bool {
        self.get_between(dest, 0, to)
    }

    /// ORs the documents of keys `from..=to` into `dest`.
    ///
    /// Returns false, leaving `dest` untouched, on an empty or inverted range
    /// or when no key in it has documents.
    pub fn get_between(&self, dest: &mut ArrayBitSet, from: usize, to: usize) -> bool {
        let keys = self.keys_count();
        if keys == 0 || from > to || from >= keys {
            return false;
        }
        let to = to.min(keys - 1);
        match self {
            MultiMap::List(m) => m.get_between(dest, from, to),
            MultiMap::BitSet(m) => m.get_between(dest, from, to),
        }
    }

    /// Documents of `key` that are also in `filter`, ascending
    pub fn documents_of(&self, key: usize, filter: &dyn BitSet) -> Vec<usize> {
        match self {
            MultiMap::List(m) => m.documents_of(key, filter),
            MultiMap::BitSet(m) => m.documents_of(key, filter),
        }
    }

    /// `(key, documents)` pairs in ascending key order, restricted to `docs`.
    /// Keys without a document in `docs` are skipped.
    pub fn ascending<'a>(&'a self, docs: &'a dyn BitSet) -> KeyGroups<'a> {
        KeyGroups {
            map: self,
            docs,
            front: 0,
            back: self.keys_count(),
            descending: false,
        }
    }

    /// Same as `ascending`, in descending key order
    pub fn descending<'a>(&'a self, docs: &'a dyn BitSet) -> KeyGroups<'a> {
        KeyGroups {
            map: self,
            docs,
            front: 0,
            back: self.keys_count(),
            descending: true,
        }
    }
}

/// Lazy iterator over the non-empty key groups of a multimap
pub struct KeyGroups<'a> {
    map: &'a MultiMap,
    docs: &'a dyn BitSet,
    front: usize,
    back: usize,
    descending: bool,
}

impl Iterator for KeyGroups<'_> {
    type Item = (usize, Vec<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        while self.front < self.back {
            let key = if self.descending {
                self.back -= 1;
                self.back
            } else {
                self.front += 1;
                self.front - 1
            };
            let documents = self.map.documents_of(key, self.docs);
            if !documents.is_empty() {
                return Some((key, documents));
            }
        }
        None
    }
}
