//! Dictionary build side
//!
//! `SortedSetBuilder` deduplicates values while documents are accumulated.
//! `seal` freezes it into a `SealedSortedSet` with final ranks, O(1) lookups
//! and the three serializers.

use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use super::trie;
use super::{KIND_FIXED, KIND_TRIE, KIND_VARIABLE};
use crate::format::codec::put_u32;

/// Accumulates distinct byte strings
#[derive(Debug, Default)]
pub struct SortedSetBuilder {
    values: BTreeSet<Arc<[u8]>>,
}

impl SortedSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` if absent and returns the canonical stored instance.
    ///
    /// Adding an equal value again returns the same allocation.
    pub fn add(&mut self, value: &[u8]) -> Arc<[u8]> {
        if let Some(existing) = self.values.get(value) {
            return Arc::clone(existing);
        }
        let stored: Arc<[u8]> = Arc::from(value);
        self.values.insert(Arc::clone(&stored));
        stored
    }

    /// Rank of `value` among the values added so far
    pub fn index_of(&self, value: &[u8]) -> Option<usize> {
        if !self.values.contains(value) {
            return None;
        }
        Some(
            self.values
                .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(value)))
                .count(),
        )
    }

    /// Number of distinct values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Freezes the builder
    pub fn seal(self) -> SealedSortedSet {
        let values: Vec<Arc<[u8]>> = self.values.into_iter().collect();
        let index = values
            .iter()
            .enumerate()
            .map(|(i, v)| (Arc::clone(v), i))
            .collect();
        SealedSortedSet { values, index }
    }
}

/// Frozen dictionary with final ranks
#[derive(Debug, Clone)]
pub struct SealedSortedSet {
    values: Vec<Arc<[u8]>>,
    index: HashMap<Arc<[u8]>, usize>,
}

impl SealedSortedSet {
    /// Final rank of `value`
    pub fn index_of(&self, value: &[u8]) -> Option<usize> {
        self.index.get(value).copied()
    }

    /// Value of rank `index`
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.values.get(index).map(|v| &v[..])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Common element length, if every element has the same one
    pub fn uniform_len(&self) -> Option<usize> {
        let first = self.values.first()?.len();
        self.values
            .iter()
            .all(|v| v.len() == first)
            .then_some(first)
    }

    /// Writes the fixed-length form.
    ///
    /// Callers ensure `uniform_len()` is `Some` or the set is empty.
    pub fn write_fixed(&self, out: &mut Vec<u8>) {
        let width = self.uniform_len().unwrap_or(0);
        put_u32(out, KIND_FIXED as usize);
        put_u32(out, self.values.len());
        put_u32(out, width);
        for value in &self.values {
            out.extend_from_slice(value);
        }
    }

    /// Writes the variable-length form
    pub fn write_variable(&self, out: &mut Vec<u8>) {
        put_u32(out, KIND_VARIABLE as usize);
        put_u32(out, self.values.len());
        let mut offset = 0usize;
        put_u32(out, offset);
        for value in &self.values {
            offset += value.len();
            put_u32(out, offset);
        }
        for value in &self.values {
            out.extend_from_slice(value);
        }
    }

    /// Writes the trie form
    pub fn write_trie(&self, out: &mut Vec<u8>) {
        put_u32(out, KIND_TRIE as usize);
        let values: Vec<&[u8]> = self.values.iter().map(|v| &v[..]).collect();
        trie::write(&values, out);
    }

    /// Serialized size of the fixed-length form
    pub fn fixed_len(&self) -> usize {
        12 + self.values.iter().map(|v| v.len()).sum::<usize>()
    }

    /// Serialized size of the variable-length form
    pub fn variable_len(&self) -> usize {
        12 + 4 * self.values.len() + self.values.iter().map(|v| v.len()).sum::<usize>()
    }
}
