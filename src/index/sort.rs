//! Sortable index: ranked traversal of documents by field value
//!
//! A document's rank is the dictionary index of its value, so rank order is
//! value order. Documents without a value have no rank; they are not part of
//! any rank group and callers place them after the ranked ones.

use std::borrow::Cow;

use crate::bitset::BitSet;
use crate::buffer::Buffer;
use crate::dictionary::{Dictionary, SortedByteArraySet};
use crate::format::codec::{table_len, take_slice, take_u32};
use crate::format::{FormatError, FormatResult};
use crate::multimap::{KeyGroups, MultiMap};

/// Stored rank of a document without a value
pub const NO_RANK: u32 = u32::MAX;

/// Gathering per-document ranks beats walking every rank when the candidate
/// set is this many times smaller than the rank count
const SPARSE_FACTOR: usize = 8;

/// Document ↔ rank mapping of one field
#[derive(Debug, Clone)]
pub struct SortableIndex {
    name: String,
    dictionary: Dictionary,
    multimap: MultiMap,
    ranks: Buffer,
    documents: usize,
    unranked: usize,
}

impl SortableIndex {
    /// Decodes `[u32 documents][documents × u32 rank]` at the cursor and
    /// assembles the index
    pub fn decode(
        name: impl Into<String>,
        dictionary: Dictionary,
        multimap: MultiMap,
        buffer: &mut Buffer,
    ) -> FormatResult<Self> {
        let documents = take_u32(buffer, "sortable document count")?;
        let ranks_len = table_len(documents, 4, "sortable ranks")?;
        let ranks = take_slice(buffer, ranks_len, "sortable ranks")?;

        let keys = dictionary.size();
        if multimap.keys_count() != keys {
            return Err(FormatError::corrupt(format!(
                "sortable multimap has {} keys for {} values",
                multimap.keys_count(),
                keys
            )));
        }
        let mut unranked = 0;
        for doc in 0..documents {
            let rank = ranks.u32_at(doc * 4);
            if rank == NO_RANK {
                unranked += 1;
            } else if rank as usize >= keys {
                return Err(FormatError::corrupt(format!(
                    "document {} has rank {} of {}",
                    doc, rank, keys
                )));
            }
        }

        Ok(Self {
            name: name.into(),
            dictionary,
            multimap,
            ranks,
            documents,
            unranked,
        })
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Number of documents covered
    pub fn document_count(&self) -> usize {
        self.documents
    }

    /// Number of distinct ranks
    pub fn rank_count(&self) -> usize {
        self.dictionary.size()
    }

    /// Rank of `document`, or `None` if it has no value
    pub fn sort_value_index(&self, document: usize) -> Option<usize> {
        if document >= self.documents {
            return None;
        }
        match self.ranks.u32_at(document * 4) {
            NO_RANK => None,
            rank => Some(rank as usize),
        }
    }

    /// Value of rank `index`
    pub fn sort_value(&self, index: usize) -> Cow<'_, [u8]> {
        self.dictionary.get(index)
    }

    /// `(rank, documents)` groups in ascending value order, restricted to
    /// `docs`; ranks with no surviving document are skipped
    pub fn ascending<'a>(&'a self, docs: &'a dyn BitSet) -> RankGroups<'a> {
        self.groups(docs, false)
    }

    /// Same as `ascending`, in descending value order
    pub fn descending<'a>(&'a self, docs: &'a dyn BitSet) -> RankGroups<'a> {
        self.groups(docs, true)
    }

    /// Documents of `docs` without a value, ascending
    pub fn unranked(&self, docs: &dyn BitSet) -> Vec<usize> {
        if self.unranked == 0 {
            return Vec::new();
        }
        let mut missing = Vec::new();
        let mut next = docs.next_set_bit(0);
        while let Some(doc) = next {
            if self.sort_value_index(doc).is_none() {
                missing.push(doc);
            }
            next = docs.next_set_bit(doc + 1);
        }
        missing
    }

    fn groups<'a>(&'a self, docs: &'a dyn BitSet, descending: bool) -> RankGroups<'a> {
        let candidates = docs.cardinality();
        if candidates.saturating_mul(SPARSE_FACTOR) < self.rank_count() {
            return RankGroups::Gathered(self.gather(docs, descending).into_iter());
        }
        if descending {
            RankGroups::Walk(self.multimap.descending(docs))
        } else {
            RankGroups::Walk(self.multimap.ascending(docs))
        }
    }

    /// Groups `docs` by reading each document's rank
    fn gather(&self, docs: &dyn BitSet, descending: bool) -> Vec<(usize, Vec<usize>)> {
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        let mut next = docs.next_set_bit(0);
        while let Some(doc) = next {
            if let Some(rank) = self.sort_value_index(doc) {
                pairs.push((rank, doc));
            }
            next = docs.next_set_bit(doc + 1);
        }
        pairs.sort_unstable();

        let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
        for (rank, doc) in pairs {
            match groups.last_mut() {
                Some((last, members)) if *last == rank => members.push(doc),
                _ => groups.push((rank, vec![doc])),
            }
        }
        if descending {
            groups.reverse();
        }
        groups
    }
}

/// Lazy, non-restartable iterator over `(rank, documents)` groups
pub enum RankGroups<'a> {
    Walk(KeyGroups<'a>),
    Gathered(std::vec::IntoIter<(usize, Vec<usize>)>),
}

impl Iterator for RankGroups<'_> {
    type Item = (usize, Vec<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            RankGroups::Walk(groups) => groups.next(),
            RankGroups::Gathered(groups) => groups.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitset::{ArrayBitSet, OneBitSet};
    use crate::dictionary::SortedSetBuilder;
    use crate::format::codec::put_u32;
    use crate::multimap::MultiMapBuilder;

    /// Document `i` holds `values[i]`; `None` means no value
    fn index(values: &[Option<&str>]) -> SortableIndex {
        let mut dict = SortedSetBuilder::new();
        for v in values.iter().flatten() {
            dict.add(v.as_bytes());
        }
        let sealed = dict.seal();
        let mut builder = MultiMapBuilder::new(sealed.len(), values.len());
        let mut ranks = Vec::new();
        for (doc, v) in values.iter().enumerate() {
            match v.and_then(|v| sealed.index_of(v.as_bytes())) {
                Some(rank) => {
                    builder.put(rank, doc);
                    ranks.push(rank as u32);
                }
                None => ranks.push(NO_RANK),
            }
        }

        let mut out = Vec::new();
        sealed.write_variable(&mut out);
        builder.write(&mut out);
        put_u32(&mut out, values.len());
        for rank in ranks {
            out.extend_from_slice(&rank.to_le_bytes());
        }

        let mut buffer = Buffer::from_vec(out);
        let dictionary = Dictionary::decode(&mut buffer).unwrap();
        let multimap = MultiMap::decode(&mut buffer, values.len()).unwrap();
        SortableIndex::decode("field", dictionary, multimap, &mut buffer).unwrap()
    }

    #[test]
    fn test_sort_value_lookups() {
        let idx = index(&[Some("m"), Some("a"), None, Some("m")]);
        assert_eq!(idx.sort_value_index(0), Some(1));
        assert_eq!(idx.sort_value_index(1), Some(0));
        assert_eq!(idx.sort_value_index(2), None);
        assert_eq!(&idx.sort_value(1)[..], b"m");
    }

    #[test]
    fn test_ascending_and_descending() {
        let idx = index(&[Some("m"), Some("a"), Some("z"), Some("m")]);
        let all = OneBitSet::new(4);
        let asc: Vec<_> = idx.ascending(&all).collect();
        assert_eq!(asc, vec![(0, vec![1]), (1, vec![0, 3]), (2, vec![2])]);

        let desc: Vec<_> = idx.descending(&all).collect();
        assert_eq!(desc, vec![(2, vec![2]), (1, vec![0, 3]), (0, vec![1])]);
    }

    #[test]
    fn test_restricted_groups_skip_empty_ranks() {
        let idx = index(&[Some("m"), Some("a"), Some("z"), Some("m")]);
        let filter = ArrayBitSet::from_indexes(4, [2, 3]);
        let asc: Vec<_> = idx.ascending(&filter).collect();
        assert_eq!(asc, vec![(1, vec![3]), (2, vec![2])]);
    }

    #[test]
    fn test_sparse_gathering_matches_walk() {
        let values: Vec<String> = (0..200).map(|i| format!("v{:03}", i)).collect();
        let refs: Vec<Option<&str>> = values.iter().map(|v| Some(v.as_str())).collect();
        let idx = index(&refs);

        let sparse = ArrayBitSet::from_indexes(200, [150, 7, 99]);
        assert!(matches!(idx.ascending(&sparse), RankGroups::Gathered(_)));
        let asc: Vec<_> = idx.ascending(&sparse).collect();
        assert_eq!(asc, vec![(7, vec![7]), (99, vec![99]), (150, vec![150])]);

        let desc: Vec<_> = idx.descending(&sparse).map(|(rank, _)| rank).collect();
        assert_eq!(desc, vec![150, 99, 7]);
    }

    #[test]
    fn test_unranked_documents() {
        let idx = index(&[Some("b"), None, Some("a"), None]);
        let all = OneBitSet::new(4);
        assert_eq!(idx.unranked(&all), vec![1, 3]);
        let asc: Vec<_> = idx.ascending(&all).collect();
        assert_eq!(asc, vec![(0, vec![2]), (1, vec![0])]);
    }

    #[test]
    fn test_rejects_rank_out_of_range() {
        let mut dict = SortedSetBuilder::new();
        dict.add(b"a");
        let sealed = dict.seal();
        let mut builder = MultiMapBuilder::new(1, 1);
        builder.put(0, 0);

        let mut out = Vec::new();
        sealed.write_variable(&mut out);
        builder.write(&mut out);
        put_u32(&mut out, 1);
        put_u32(&mut out, 5);

        let mut buffer = Buffer::from_vec(out);
        let dictionary = Dictionary::decode(&mut buffer).unwrap();
        let multimap = MultiMap::decode(&mut buffer, 1).unwrap();
        let err = SortableIndex::decode("f", dictionary, multimap, &mut buffer).unwrap_err();
        assert_eq!(err.code().code(), "SEAL_FORMAT_CORRUPT");
    }
}
