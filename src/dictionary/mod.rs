//! Ordered byte-string dictionaries
//!
//! A dictionary is a bijection between `[0, size)` and a set of distinct byte
//! strings sorted by unsigned lexicographic order, so `index_of(get(i)) == i`.
//! Absent values have no index (`None`).
//!
//! Three read-side encodings share the `SortedByteArraySet` contract:
//! - fixed-length: every element has the same width, no offset table
//! - variable-length: offset table plus concatenated bytes
//! - trie: shared prefixes stored once, see `trie`
//!
//! Every serialized dictionary starts with a u32 kind tag.

mod builder;
mod flat;
mod trie;

use std::borrow::Cow;

pub use builder::{SealedSortedSet, SortedSetBuilder};
pub use flat::{FixedLengthSortedSet, VariableLengthSortedSet};
pub use trie::{TrieNode, TrieSortedSet};

use crate::buffer::Buffer;
use crate::format::codec::take_u32;
use crate::format::{FormatError, FormatResult};

/// Kind tag of a fixed-length dictionary
pub const KIND_FIXED: u32 = 1;
/// Kind tag of a variable-length dictionary
pub const KIND_VARIABLE: u32 = 2;
/// Kind tag of a trie dictionary
pub const KIND_TRIE: u32 = 3;

/// Read contract over a sorted set of distinct byte strings
pub trait SortedByteArraySet {
    /// Number of elements
    fn size(&self) -> usize;

    /// Element at `index`.
    ///
    /// Panics if `index >= size()`.
    fn get(&self, index: usize) -> Cow<'_, [u8]>;

    /// First index in `[from, to)` whose element is `>= e`, or `> e` when
    /// `skip_equal` is set; `to` if there is none.
    fn search(&self, e: &[u8], skip_equal: bool, from: usize, to: usize) -> usize;

    /// Index of `e`, or `None` if absent
    fn index_of(&self, e: &[u8]) -> Option<usize> {
        let size = self.size();
        let i = self.search(e, false, 0, size);
        (i < size && *self.get(i) == *e).then_some(i)
    }

    /// Smallest index whose element is `> e` (`>= e` with `or_equals`),
    /// not past `upper_bound_inclusive`. Pass `usize::MAX` for no bound.
    fn index_of_greater_than(
        &self,
        e: &[u8],
        or_equals: bool,
        upper_bound_inclusive: usize,
    ) -> Option<usize> {
        let size = self.size();
        if size == 0 {
            return None;
        }
        let hi = upper_bound_inclusive.min(size - 1);
        let i = self.search(e, !or_equals, 0, hi + 1);
        (i <= hi).then_some(i)
    }

    /// Largest index whose element is `< e` (`<= e` with `or_equals`),
    /// not before `lower_bound_inclusive`. Pass `0` for no bound.
    fn index_of_less_than(
        &self,
        e: &[u8],
        or_equals: bool,
        lower_bound_inclusive: usize,
    ) -> Option<usize> {
        let size = self.size();
        if lower_bound_inclusive >= size {
            return None;
        }
        let j = self.search(e, or_equals, lower_bound_inclusive, size);
        (j > lower_bound_inclusive).then(|| j - 1)
    }
}

/// Binary search over `[from, to)` using an element comparator
pub(crate) fn partition<F>(from: usize, to: usize, mut goes_left: F) -> usize
where
    F: FnMut(usize) -> bool,
{
    let (mut lo, mut hi) = (from, to);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if goes_left(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Any decoded dictionary
#[derive(Debug, Clone)]
pub enum Dictionary {
    Fixed(FixedLengthSortedSet),
    Variable(VariableLengthSortedSet),
    Trie(TrieSortedSet),
}

impl Dictionary {
    /// Decodes a dictionary at the cursor, kind tag included
    pub fn decode(buffer: &mut Buffer) -> FormatResult<Self> {
        let at = buffer.position();
        let kind = take_u32(buffer, "dictionary kind")? as u32;
        match kind {
            KIND_FIXED => FixedLengthSortedSet::decode(buffer).map(Dictionary::Fixed),
            KIND_VARIABLE => VariableLengthSortedSet::decode(buffer).map(Dictionary::Variable),
            KIND_TRIE => TrieSortedSet::decode(buffer).map(Dictionary::Trie),
            other => Err(FormatError::corrupt(format!(
                "unknown dictionary kind {} at byte {}",
                other, at
            ))),
        }
    }

    /// Kind tag of this dictionary
    pub fn kind(&self) -> u32 {
        match self {
            Dictionary::Fixed(_) => KIND_FIXED,
            Dictionary::Variable(_) => KIND_VARIABLE,
            Dictionary::Trie(_) => KIND_TRIE,
        }
    }

    fn inner(&self) -> &dyn SortedByteArraySet {
        match self {
            Dictionary::Fixed(d) => d,
            Dictionary::Variable(d) => d,
            Dictionary::Trie(d) => d,
        }
    }
}

impl SortedByteArraySet for Dictionary {
    fn size(&self) -> usize {
        self.inner().size()
    }

    fn get(&self, index: usize) -> Cow<'_, [u8]> {
        self.inner().get(index)
    }

    fn search(&self, e: &[u8], skip_equal: bool, from: usize, to: usize) -> usize {
        self.inner().search(e, skip_equal, from, to)
    }

    fn index_of(&self, e: &[u8]) -> Option<usize> {
        self.inner().index_of(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encodings(values: &[&[u8]]) -> Vec<Dictionary> {
        let mut builder = SortedSetBuilder::new();
        for v in values {
            builder.add(v);
        }
        let sealed = builder.seal();

        let mut out = Vec::new();
        let mut forms = Vec::new();
        if sealed.uniform_len().is_some() || sealed.is_empty() {
            out.clear();
            sealed.write_fixed(&mut out);
            forms.push(Dictionary::decode(&mut Buffer::from_vec(out.clone())).unwrap());
        }
        out.clear();
        sealed.write_variable(&mut out);
        forms.push(Dictionary::decode(&mut Buffer::from_vec(out.clone())).unwrap());
        out.clear();
        sealed.write_trie(&mut out);
        forms.push(Dictionary::decode(&mut Buffer::from_vec(out.clone())).unwrap());
        forms
    }

    #[test]
    fn test_all_forms_agree() {
        let values: Vec<&[u8]> = vec![&b"ant"[..], b"bee", b"cat", b"cow", b"dog"];
        for dict in encodings(&values) {
            assert_eq!(dict.size(), 5);
            for (i, v) in values.iter().enumerate() {
                assert_eq!(&dict.get(i)[..], *v, "kind {}", dict.kind());
                assert_eq!(dict.index_of(v), Some(i));
            }
            assert_eq!(dict.index_of(b"cab"), None);
        }
    }

    #[test]
    fn test_greater_than() {
        let values: Vec<&[u8]> = vec![&b"b"[..], b"d", b"f"];
        for dict in encodings(&values) {
            assert_eq!(dict.index_of_greater_than(b"d", false, usize::MAX), Some(2));
            assert_eq!(dict.index_of_greater_than(b"d", true, usize::MAX), Some(1));
            assert_eq!(dict.index_of_greater_than(b"a", false, usize::MAX), Some(0));
            assert_eq!(dict.index_of_greater_than(b"f", false, usize::MAX), None);
            // Window stops the search
            assert_eq!(dict.index_of_greater_than(b"d", false, 1), None);
        }
    }

    #[test]
    fn test_less_than() {
        let values: Vec<&[u8]> = vec![&b"b"[..], b"d", b"f"];
        for dict in encodings(&values) {
            assert_eq!(dict.index_of_less_than(b"d", false, 0), Some(0));
            assert_eq!(dict.index_of_less_than(b"d", true, 0), Some(1));
            assert_eq!(dict.index_of_less_than(b"z", false, 0), Some(2));
            assert_eq!(dict.index_of_less_than(b"b", false, 0), None);
            assert_eq!(dict.index_of_less_than(b"e", false, 2), None);
        }
    }

    #[test]
    fn test_empty_dictionary() {
        for dict in encodings(&[]) {
            assert_eq!(dict.size(), 0);
            assert_eq!(dict.index_of(b"x"), None);
            assert_eq!(dict.index_of_greater_than(b"", true, usize::MAX), None);
            assert_eq!(dict.index_of_less_than(b"zzz", true, 0), None);
        }
    }

    #[test]
    fn test_unknown_kind() {
        let mut buffer = Buffer::from_vec(9u32.to_le_bytes().to_vec());
        let err = Dictionary::decode(&mut buffer).unwrap_err();
        assert_eq!(err.code().code(), "SEAL_FORMAT_CORRUPT");
    }
}
