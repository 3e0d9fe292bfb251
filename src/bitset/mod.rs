//! Document bit sets
//!
//! A bit set has a fixed capacity equal to the document count of the database
//! it serves. Bit `i` lives at `words[i / 64] & (1 << (i % 64))`; bits past
//! `size` in the last word are always zero, so word-level algebra and
//! popcount never see phantom documents.
//!
//! - `BitSet`: read contract shared by every variant
//! - `ArrayBitSet`: mutable working set
//! - `ZeroBitSet` / `OneBitSet`: allocation-free empty and full seeds
//! - `pool`: bounded scratch-set allocator used by query execution

mod array;
mod errors;
mod fixed;
pub mod pool;

pub use array::{ArrayBitSet, SetBits};
pub use errors::{PoolError, PoolErrorCode, PoolResult};
pub use fixed::{OneBitSet, ZeroBitSet};
pub use pool::{BitSetPool, QueryContext, ScratchPool};

/// Number of 64-bit words needed to hold `size` bits
pub fn words_for(size: usize) -> usize {
    (size + 63) / 64
}

/// Mask of the valid bits in the last word of a `size`-bit set
pub(crate) fn last_word_mask(size: usize) -> u64 {
    match size % 64 {
        0 => u64::MAX,
        bits => (1u64 << bits) - 1,
    }
}

/// Read contract over a fixed-capacity bit set
pub trait BitSet {
    /// Capacity in bits
    fn size(&self) -> usize;

    /// Number of set bits
    fn cardinality(&self) -> usize;

    /// Tests bit `index`; out-of-range indexes read as unset
    fn get(&self, index: usize) -> bool;

    /// Lowest set index `>= from`, or `None`
    fn next_set_bit(&self, from: usize) -> Option<usize>;

    /// Raw word `index`
    fn word(&self, index: usize) -> u64;

    /// Number of backing words
    fn word_count(&self) -> usize {
        words_for(self.size())
    }

    /// Returns true if no bit is set
    fn is_empty(&self) -> bool {
        self.next_set_bit(0).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_for() {
        assert_eq!(words_for(0), 0);
        assert_eq!(words_for(1), 1);
        assert_eq!(words_for(64), 1);
        assert_eq!(words_for(65), 2);
    }

    #[test]
    fn test_last_word_mask() {
        assert_eq!(last_word_mask(64), u64::MAX);
        assert_eq!(last_word_mask(3), 0b111);
        assert_eq!(last_word_mask(65), 1);
    }
}
