//! List-encoded multimap

use crate::bitset::{ArrayBitSet, BitSet};
use crate::buffer::Buffer;
use crate::format::codec::{table_len, take_slice, take_u32};
use crate::format::{FormatError, FormatResult};

/// Explicit document id arrays per key
#[derive(Debug, Clone)]
pub struct ListMultiMap {
    keys: usize,
    offsets: Buffer,
    documents: Buffer,
}

impl ListMultiMap {
    /// Decodes the body that follows the tag
    pub fn decode(buffer: &mut Buffer, document_count: usize) -> FormatResult<Self> {
        let keys = take_u32(buffer, "list multimap keys")?;
        let entries = keys
            .checked_add(1)
            .ok_or_else(|| FormatError::corrupt("list multimap key count overflow"))?;
        let offsets_len = table_len(entries, 4, "list multimap offsets")?;
        let offsets = take_slice(buffer, offsets_len, "list multimap offsets")?;

        let mut previous = 0usize;
        for i in 0..entries {
            let offset = offsets.u32_at(i * 4) as usize;
            if (i == 0 && offset != 0) || offset < previous {
                return Err(FormatError::corrupt(format!(
                    "list multimap offset {} out of order",
                    i
                )));
            }
            previous = offset;
        }

        let documents_len = table_len(previous, 4, "list multimap documents")?;
        let documents = take_slice(buffer, documents_len, "list multimap documents")?;
        for i in 0..previous {
            let doc = documents.u32_at(i * 4) as usize;
            if doc >= document_count {
                return Err(FormatError::corrupt(format!(
                    "list multimap references document {} of {}",
                    doc, document_count
                )));
            }
        }

        Ok(Self {
            keys,
            offsets,
            documents,
        })
    }

    pub fn keys_count(&self) -> usize {
        self.keys
    }

    fn offset(&self, entry: usize) -> usize {
        self.offsets.u32_at(entry * 4) as usize
    }

    fn document(&self, position: usize) -> usize {
        self.documents.u32_at(position * 4) as usize
    }

    /// Keys `from..=to`, both in range
    pub(super) fn get_between(&self, dest: &mut ArrayBitSet, from: usize, to: usize) -> bool {
        let start = self.offset(from);
        let end = self.offset(to + 1);
        for position in start..end {
            dest.set(self.document(position));
        }
        start < end
    }

    pub(super) fn documents_of(&self, key: usize, filter: &dyn BitSet) -> Vec<usize> {
        if key >= self.keys {
            return Vec::new();
        }
        (self.offset(key)..self.offset(key + 1))
            .map(|position| self.document(position))
            .filter(|&doc| filter.get(doc))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_document_out_of_range() {
        let mut bytes = Vec::new();
        for v in [1u32, 0, 1, 5] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let err = ListMultiMap::decode(&mut Buffer::from_vec(bytes), 3).unwrap_err();
        assert_eq!(err.code().code(), "SEAL_FORMAT_CORRUPT");
    }

    #[test]
    fn test_rejects_truncated_documents() {
        let mut bytes = Vec::new();
        for v in [1u32, 0, 2, 0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let err = ListMultiMap::decode(&mut Buffer::from_vec(bytes), 3).unwrap_err();
        assert_eq!(err.code().code(), "SEAL_FORMAT_TRUNCATED");
    }
}
