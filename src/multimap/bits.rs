//! Bit-set-encoded multimap
//!
//! Each key owns `words_per_key` little-endian words. Lookups OR those words
//! straight from the backing buffer into the destination set.

use crate::bitset::{words_for, ArrayBitSet, BitSet};
use crate::buffer::Buffer;
use crate::format::codec::{table_len, take_slice, take_u32};
use crate::format::{FormatError, FormatResult};

/// One stored bit vector per key
#[derive(Debug, Clone)]
pub struct BitSetMultiMap {
    keys: usize,
    words_per_key: usize,
    document_count: usize,
    words: Buffer,
}

impl BitSetMultiMap {
    /// Decodes the body that follows the tag
    pub fn decode(buffer: &mut Buffer, document_count: usize) -> FormatResult<Self> {
        let keys = take_u32(buffer, "bitset multimap keys")?;
        let words_per_key = take_u32(buffer, "bitset multimap words per key")?;
        if words_per_key != words_for(document_count) {
            return Err(FormatError::corrupt(format!(
                "bitset multimap has {} words per key for {} documents",
                words_per_key, document_count
            )));
        }
        let word_count = table_len(keys, words_per_key, "bitset multimap")?;
        let words_len = table_len(word_count, 8, "bitset multimap")?;
        let words = take_slice(buffer, words_len, "bitset multimap words")?;
        Ok(Self {
            keys,
            words_per_key,
            document_count,
            words,
        })
    }

    pub fn keys_count(&self) -> usize {
        self.keys
    }

    fn word(&self, key: usize, index: usize) -> u64 {
        self.words.u64_at((key * self.words_per_key + index) * 8)
    }

    /// Keys `from..=to`, both in range
    pub(super) fn get_between(&self, dest: &mut ArrayBitSet, from: usize, to: usize) -> bool {
        let mut matched = false;
        for key in from..=to {
            let any = (0..self.words_per_key).any(|i| self.word(key, i) != 0);
            if any {
                dest.or_words(&self.words, key * self.words_per_key * 8, self.words_per_key);
                matched = true;
            }
        }
        matched
    }

    pub(super) fn documents_of(&self, key: usize, filter: &dyn BitSet) -> Vec<usize> {
        let mut documents = Vec::new();
        if key >= self.keys {
            return documents;
        }
        for i in 0..self.words_per_key {
            let mut word = self.word(key, i) & filter.word(i);
            while word != 0 {
                let doc = i * 64 + word.trailing_zeros() as usize;
                if doc < self.document_count {
                    documents.push(doc);
                }
                word &= word - 1;
            }
        }
        documents
    }
}
