//! Filterable index: field values → document bit sets

use crate::bitset::ArrayBitSet;
use crate::dictionary::{Dictionary, SortedByteArraySet};
use crate::multimap::MultiMap;

/// Equality, membership and range lookups over one field.
///
/// Every lookup ORs matches into `dest` and returns whether anything matched.
/// On `false` the destination is untouched; it is not cleared.
#[derive(Debug, Clone)]
pub struct FilterableIndex {
    name: String,
    dictionary: Dictionary,
    multimap: MultiMap,
}

impl FilterableIndex {
    pub fn new(name: impl Into<String>, dictionary: Dictionary, multimap: MultiMap) -> Self {
        Self {
            name: name.into(),
            dictionary,
            multimap,
        }
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn multimap(&self) -> &MultiMap {
        &self.multimap
    }

    /// Documents whose value equals `value`
    pub fn eq(&self, dest: &mut ArrayBitSet, value: &[u8]) -> bool {
        match self.dictionary.index_of(value) {
            Some(key) => self.multimap.get(dest, key),
            None => false,
        }
    }

    /// Documents whose value is any of `values`; false iff none is present
    pub fn in_values<I, V>(&self, dest: &mut ArrayBitSet, values: I) -> bool
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[u8]>,
    {
        let mut matched = false;
        for value in values {
            matched |= self.eq(dest, value.as_ref());
        }
        matched
    }

    /// Documents whose value is `< value` (`<=` with `or_equals`)
    pub fn less_than(&self, dest: &mut ArrayBitSet, value: &[u8], or_equals: bool) -> bool {
        match self.dictionary.index_of_less_than(value, or_equals, 0) {
            Some(upper) => self.multimap.get_to(dest, upper),
            None => false,
        }
    }

    /// Documents whose value is `> value` (`>=` with `or_equals`)
    pub fn greater_than(&self, dest: &mut ArrayBitSet, value: &[u8], or_equals: bool) -> bool {
        match self
            .dictionary
            .index_of_greater_than(value, or_equals, usize::MAX)
        {
            Some(lower) => self.multimap.get_from(dest, lower),
            None => false,
        }
    }

    /// Documents whose value lies between `from` and `to`.
    ///
    /// The lower boundary bounds the search for the upper one. An empty or
    /// inverted resolved range matches nothing.
    pub fn between(
        &self,
        dest: &mut ArrayBitSet,
        from: &[u8],
        from_inclusive: bool,
        to: &[u8],
        to_inclusive: bool,
    ) -> bool {
        let Some(lower) = self
            .dictionary
            .index_of_greater_than(from, from_inclusive, usize::MAX)
        else {
            return false;
        };
        let Some(upper) = self.dictionary.index_of_less_than(to, to_inclusive, lower) else {
            return false;
        };
        if upper < lower {
            return false;
        }
        self.multimap.get_between(dest, lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitset::BitSet;
    use crate::buffer::Buffer;
    use crate::dictionary::SortedSetBuilder;
    use crate::multimap::{Encoding, MultiMapBuilder};

    /// Document `i` holds `values[i]`
    fn index(values: &[&str], trie: bool, encoding: Encoding) -> FilterableIndex {
        let mut dict = SortedSetBuilder::new();
        for v in values {
            dict.add(v.as_bytes());
        }
        let sealed = dict.seal();
        let mut builder = MultiMapBuilder::new(sealed.len(), values.len());
        for (doc, v) in values.iter().enumerate() {
            if let Some(key) = sealed.index_of(v.as_bytes()) {
                builder.put(key, doc);
            }
        }

        let mut out = Vec::new();
        if trie {
            sealed.write_trie(&mut out);
        } else {
            sealed.write_variable(&mut out);
        }
        builder.write_as(encoding, &mut out);

        let mut buffer = Buffer::from_vec(out);
        let dictionary = Dictionary::decode(&mut buffer).unwrap();
        let multimap = MultiMap::decode(&mut buffer, values.len()).unwrap();
        FilterableIndex::new("field", dictionary, multimap)
    }

    fn all_forms(values: &[&str]) -> Vec<FilterableIndex> {
        vec![
            index(values, false, Encoding::List),
            index(values, false, Encoding::BitSet),
            index(values, true, Encoding::List),
            index(values, true, Encoding::BitSet),
        ]
    }

    fn docs(set: &ArrayBitSet) -> Vec<usize> {
        set.iter().collect()
    }

    const VALUES: &[&str] = &["b", "d", "b", "f", "h"];

    #[test]
    fn test_eq() {
        for idx in all_forms(VALUES) {
            let mut dest = ArrayBitSet::new(5);
            assert!(idx.eq(&mut dest, b"b"));
            assert_eq!(docs(&dest), vec![0, 2]);
        }
    }

    #[test]
    fn test_eq_is_idempotent() {
        for idx in all_forms(VALUES) {
            let mut first = ArrayBitSet::new(5);
            let mut second = ArrayBitSet::new(5);
            assert_eq!(idx.eq(&mut first, b"d"), idx.eq(&mut second, b"d"));
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_eq_absent_leaves_dest() {
        for idx in all_forms(VALUES) {
            let mut dest = ArrayBitSet::from_indexes(5, [1, 4]);
            let before = dest.clone();
            assert!(!idx.eq(&mut dest, b"c"));
            assert_eq!(dest, before);
        }
    }

    #[test]
    fn test_in_values() {
        for idx in all_forms(VALUES) {
            let mut dest = ArrayBitSet::new(5);
            assert!(idx.in_values(&mut dest, [&b"d"[..], b"zzz", b"h"]));
            assert_eq!(docs(&dest), vec![1, 4]);

            let mut none = ArrayBitSet::new(5);
            assert!(!idx.in_values(&mut none, [&b"a"[..], b"c"]));
            assert!(none.is_empty());
        }
    }

    #[test]
    fn test_less_and_greater() {
        for idx in all_forms(VALUES) {
            let mut lt = ArrayBitSet::new(5);
            assert!(idx.less_than(&mut lt, b"d", false));
            assert_eq!(docs(&lt), vec![0, 2]);

            let mut lte = ArrayBitSet::new(5);
            assert!(idx.less_than(&mut lte, b"d", true));
            assert_eq!(docs(&lte), vec![0, 1, 2]);

            let mut gt = ArrayBitSet::new(5);
            assert!(idx.greater_than(&mut gt, b"f", false));
            assert_eq!(docs(&gt), vec![4]);

            let mut none = ArrayBitSet::new(5);
            assert!(!idx.greater_than(&mut none, b"h", false));
            assert!(!idx.less_than(&mut none, b"b", false));
            assert!(none.is_empty());
        }
    }

    #[test]
    fn test_between() {
        for idx in all_forms(VALUES) {
            let mut inclusive = ArrayBitSet::new(5);
            assert!(idx.between(&mut inclusive, b"b", true, b"f", true));
            assert_eq!(docs(&inclusive), vec![0, 1, 2, 3]);

            let mut exclusive = ArrayBitSet::new(5);
            assert!(idx.between(&mut exclusive, b"b", false, b"f", false));
            assert_eq!(docs(&exclusive), vec![1]);

            // Nothing strictly between two adjacent values
            let mut empty = ArrayBitSet::new(5);
            assert!(!idx.between(&mut empty, b"b", false, b"d", false));
            assert!(!idx.between(&mut empty, b"g", true, b"c", true));
            assert!(empty.is_empty());
        }
    }
}
