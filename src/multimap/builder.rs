//! Multimap build side

use super::{TAG_BITSET, TAG_LIST};
use crate::bitset::words_for;
use crate::format::codec::{put_u32, put_u64};

/// Multimap encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    List,
    BitSet,
}

/// Collects key → document pairs
#[derive(Debug, Clone)]
pub struct MultiMapBuilder {
    documents: usize,
    buckets: Vec<Vec<u32>>,
}

impl MultiMapBuilder {
    /// Creates a builder for `keys` keys over `documents` documents
    pub fn new(keys: usize, documents: usize) -> Self {
        Self {
            documents,
            buckets: vec![Vec::new(); keys],
        }
    }

    /// Relates `document` to `key`.
    ///
    /// Panics if `key` or `document` is out of range.
    pub fn put(&mut self, key: usize, document: usize) {
        assert!(document < self.documents, "document {} out of range", document);
        self.buckets[key].push(document as u32);
    }

    /// Number of keys
    pub fn keys_count(&self) -> usize {
        self.buckets.len()
    }

    fn pairs(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    /// Serialized size of the list encoding, tag included
    pub fn list_len(&self) -> usize {
        4 + 4 + (self.buckets.len() + 1) * 4 + self.pairs() * 4
    }

    /// Serialized size of the bit-set encoding, tag included
    pub fn bitset_len(&self) -> usize {
        4 + 4 + 4 + self.buckets.len() * words_for(self.documents) * 8
    }

    /// The smaller encoding; ties go to the list
    pub fn choose(&self) -> Encoding {
        if self.bitset_len() < self.list_len() {
            Encoding::BitSet
        } else {
            Encoding::List
        }
    }

    /// Writes the smaller encoding
    pub fn write(&mut self, out: &mut Vec<u8>) -> Encoding {
        let encoding = self.choose();
        self.write_as(encoding, out);
        encoding
    }

    /// Writes a given encoding
    pub fn write_as(&mut self, encoding: Encoding, out: &mut Vec<u8>) {
        for bucket in &mut self.buckets {
            bucket.sort_unstable();
            bucket.dedup();
        }
        match encoding {
            Encoding::List => self.write_list(out),
            Encoding::BitSet => self.write_bitset(out),
        }
    }

    fn write_list(&self, out: &mut Vec<u8>) {
        put_u32(out, TAG_LIST as usize);
        put_u32(out, self.buckets.len());
        let mut offset = 0usize;
        put_u32(out, offset);
        for bucket in &self.buckets {
            offset += bucket.len();
            put_u32(out, offset);
        }
        for bucket in &self.buckets {
            for doc in bucket {
                out.extend_from_slice(&doc.to_le_bytes());
            }
        }
    }

    fn write_bitset(&self, out: &mut Vec<u8>) {
        let words_per_key = words_for(self.documents);
        put_u32(out, TAG_BITSET as usize);
        put_u32(out, self.buckets.len());
        put_u32(out, words_per_key);
        let mut words = vec![0u64; words_per_key];
        for bucket in &self.buckets {
            words.iter_mut().for_each(|w| *w = 0);
            for &doc in bucket {
                let doc = doc as usize;
                words[doc / 64] |= 1u64 << (doc % 64);
            }
            for &word in &words {
                put_u64(out, word);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_buckets_choose_list() {
        let mut builder = MultiMapBuilder::new(100, 10_000);
        for key in 0..100 {
            builder.put(key, key * 100);
        }
        assert_eq!(builder.choose(), Encoding::List);
    }

    #[test]
    fn test_dense_buckets_choose_bitset() {
        let mut builder = MultiMapBuilder::new(2, 1000);
        for doc in 0..1000 {
            builder.put(doc % 2, doc);
        }
        assert_eq!(builder.choose(), Encoding::BitSet);
    }

    #[test]
    fn test_written_length_matches_estimate() {
        let mut builder = MultiMapBuilder::new(3, 70);
        builder.put(0, 1);
        builder.put(2, 69);

        let mut list = Vec::new();
        builder.write_as(Encoding::List, &mut list);
        assert_eq!(list.len(), builder.list_len());

        let mut bits = Vec::new();
        builder.write_as(Encoding::BitSet, &mut bits);
        assert_eq!(bits.len(), builder.bitset_len());
    }

    #[test]
    fn test_duplicates_collapse() {
        let mut builder = MultiMapBuilder::new(1, 4);
        builder.put(0, 2);
        builder.put(0, 2);
        let mut out = Vec::new();
        builder.write_as(Encoding::List, &mut out);
        // tag + keys + 2 offsets + 1 doc
        assert_eq!(out.len(), 4 + 4 + 8 + 4);
    }
}
