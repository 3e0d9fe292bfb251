//! Read-only all-zero and all-one bit sets

use super::{last_word_mask, words_for, BitSet};

/// Empty set of a given size; never allocates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZeroBitSet {
    size: usize,
}

impl ZeroBitSet {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl BitSet for ZeroBitSet {
    fn size(&self) -> usize {
        self.size
    }

    fn cardinality(&self) -> usize {
        0
    }

    fn get(&self, _index: usize) -> bool {
        false
    }

    fn next_set_bit(&self, _from: usize) -> Option<usize> {
        None
    }

    fn word(&self, _index: usize) -> u64 {
        0
    }

    fn is_empty(&self) -> bool {
        true
    }
}

/// Full set of a given size; never allocates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneBitSet {
    size: usize,
}

impl OneBitSet {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl BitSet for OneBitSet {
    fn size(&self) -> usize {
        self.size
    }

    fn cardinality(&self) -> usize {
        self.size
    }

    fn get(&self, index: usize) -> bool {
        index < self.size
    }

    fn next_set_bit(&self, from: usize) -> Option<usize> {
        (from < self.size).then_some(from)
    }

    fn word(&self, index: usize) -> u64 {
        let words = words_for(self.size);
        if index + 1 < words {
            u64::MAX
        } else if index + 1 == words {
            last_word_mask(self.size)
        } else {
            0
        }
    }

    fn is_empty(&self) -> bool {
        self.size == 0
    }
}
