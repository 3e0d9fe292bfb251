//! Mutable word-array bit set

use std::fmt;

use super::{last_word_mask, words_for, BitSet};
use crate::buffer::Buffer;

/// Mutable bit set over a `Vec<u64>`
#[derive(Clone, PartialEq, Eq)]
pub struct ArrayBitSet {
    words: Vec<u64>,
    size: usize,
}

impl ArrayBitSet {
    /// Creates an empty set of `size` bits
    pub fn new(size: usize) -> Self {
        Self {
            words: vec![0u64; words_for(size)],
            size,
        }
    }

    /// Creates a set of `size` bits with every bit set
    pub fn full(size: usize) -> Self {
        let mut set = Self::new(size);
        set.set_all();
        set
    }

    /// Creates a set from bit positions; positions past `size` are ignored
    pub fn from_indexes(size: usize, indexes: impl IntoIterator<Item = usize>) -> Self {
        let mut set = Self::new(size);
        for index in indexes {
            if index < size {
                set.set(index);
            }
        }
        set
    }

    /// Sets bit `index`.
    ///
    /// Panics if `index >= size`.
    pub fn set(&mut self, index: usize) {
        assert!(index < self.size, "bit {} out of range {}", index, self.size);
        self.words[index / 64] |= 1u64 << (index % 64);
    }

    /// Clears bit `index`
    pub fn unset(&mut self, index: usize) {
        if index < self.size {
            self.words[index / 64] &= !(1u64 << (index % 64));
        }
    }

    /// Clears every bit
    pub fn clear_all(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Sets every bit below `size`
    pub fn set_all(&mut self) {
        self.words.iter_mut().for_each(|w| *w = u64::MAX);
        self.mask_tail();
    }

    /// Intersects with `other`; returns whether any bit remains set
    pub fn and(&mut self, other: &dyn BitSet) -> bool {
        let mut any = 0u64;
        for (i, word) in self.words.iter_mut().enumerate() {
            *word &= other.word(i);
            any |= *word;
        }
        any != 0
    }

    /// Unions with `other`
    pub fn or(&mut self, other: &dyn BitSet) {
        for (i, word) in self.words.iter_mut().enumerate() {
            *word |= other.word(i);
        }
        self.mask_tail();
    }

    /// Removes every bit set in `other`
    pub fn and_not(&mut self, other: &dyn BitSet) {
        for (i, word) in self.words.iter_mut().enumerate() {
            *word &= !other.word(i);
        }
    }

    /// Complements within `[0, size)`
    pub fn flip_all(&mut self) {
        self.words.iter_mut().for_each(|w| *w = !*w);
        self.mask_tail();
    }

    /// ORs `count` little-endian words stored at `byte_offset` of `buffer`.
    ///
    /// Words beyond this set's capacity are ignored.
    pub fn or_words(&mut self, buffer: &Buffer, byte_offset: usize, count: usize) {
        let count = count.min(self.words.len());
        for i in 0..count {
            self.words[i] |= buffer.u64_at(byte_offset + i * 8);
        }
        self.mask_tail();
    }

    /// Copies the contents of `other`, which must have the same size
    pub fn copy_from(&mut self, other: &dyn BitSet) {
        for (i, word) in self.words.iter_mut().enumerate() {
            *word = other.word(i);
        }
        self.mask_tail();
    }

    /// Iterates set bits in ascending order
    pub fn iter(&self) -> SetBits<'_> {
        SetBits { set: self, next: 0 }
    }

    /// Raw words, little end first
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    fn mask_tail(&mut self) {
        if let Some(last) = self.words.last_mut() {
            *last &= last_word_mask(self.size);
        }
    }
}

impl BitSet for ArrayBitSet {
    fn size(&self) -> usize {
        self.size
    }

    fn cardinality(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    fn get(&self, index: usize) -> bool {
        index < self.size && self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    fn next_set_bit(&self, from: usize) -> Option<usize> {
        if from >= self.size {
            return None;
        }
        let mut word_index = from / 64;
        let mut word = self.words[word_index] & (u64::MAX << (from % 64));
        loop {
            if word != 0 {
                return Some(word_index * 64 + word.trailing_zeros() as usize);
            }
            word_index += 1;
            if word_index >= self.words.len() {
                return None;
            }
            word = self.words[word_index];
        }
    }

    fn word(&self, index: usize) -> u64 {
        self.words.get(index).copied().unwrap_or(0)
    }

    fn word_count(&self) -> usize {
        self.words.len()
    }
}

impl fmt::Debug for ArrayBitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArrayBitSet(size={}, bits=", self.size)?;
        f.debug_set().entries(self.iter()).finish()?;
        write!(f, ")")
    }
}

/// Ascending iterator over the set bits of an `ArrayBitSet`
pub struct SetBits<'a> {
    set: &'a ArrayBitSet,
    next: usize,
}

impl Iterator for SetBits<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let found = self.set.next_set_bit(self.next)?;
        self.next = found + 1;
        Some(found)
    }
}
