//! Flat dictionaries: binary search over a sorted array
//!
//! ```text
//! fixed:    [u32 size][u32 element_len][size × element]
//! variable: [u32 size][(size + 1) × u32 offsets][bytes]
//! ```
//!
//! Offsets of the variable form are relative to the start of the bytes
//! region; element `i` spans `offsets[i]..offsets[i + 1]`.

use std::borrow::Cow;

use super::{partition, SortedByteArraySet};
use crate::buffer::Buffer;
use crate::format::codec::{table_len, take_slice, take_u32};
use crate::format::{FormatError, FormatResult};

/// Dictionary whose elements all have the same length
#[derive(Debug, Clone)]
pub struct FixedLengthSortedSet {
    size: usize,
    element_len: usize,
    data: Buffer,
}

impl FixedLengthSortedSet {
    /// Decodes the body that follows the kind tag
    pub fn decode(buffer: &mut Buffer) -> FormatResult<Self> {
        let size = take_u32(buffer, "fixed dictionary size")?;
        let element_len = take_u32(buffer, "fixed dictionary element length")?;
        let data_len = table_len(size, element_len, "fixed dictionary")?;
        let data = take_slice(buffer, data_len, "fixed dictionary elements")?;
        Ok(Self {
            size,
            element_len,
            data,
        })
    }

    /// Length of every element
    pub fn element_len(&self) -> usize {
        self.element_len
    }

    fn element(&self, index: usize) -> &[u8] {
        self.data.bytes_at(index * self.element_len, self.element_len)
    }
}

impl SortedByteArraySet for FixedLengthSortedSet {
    fn size(&self) -> usize {
        self.size
    }

    fn get(&self, index: usize) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.element(index))
    }

    fn search(&self, e: &[u8], skip_equal: bool, from: usize, to: usize) -> usize {
        partition(from, to, |i| {
            let element = self.element(i);
            if skip_equal {
                element <= e
            } else {
                element < e
            }
        })
    }
}

/// Dictionary with an offset table
#[derive(Debug, Clone)]
pub struct VariableLengthSortedSet {
    size: usize,
    offsets: Buffer,
    data: Buffer,
}

impl VariableLengthSortedSet {
    /// Decodes the body that follows the kind tag
    pub fn decode(buffer: &mut Buffer) -> FormatResult<Self> {
        let size = take_u32(buffer, "variable dictionary size")?;
        let entries = size
            .checked_add(1)
            .ok_or_else(|| FormatError::corrupt("variable dictionary size overflow"))?;
        let offsets_len = table_len(entries, 4, "variable dictionary offsets")?;
        let offsets = take_slice(buffer, offsets_len, "variable dictionary offsets")?;

        let mut previous = 0usize;
        for i in 0..entries {
            let offset = offsets.u32_at(i * 4) as usize;
            if (i == 0 && offset != 0) || offset < previous {
                return Err(FormatError::corrupt(format!(
                    "variable dictionary offset {} out of order",
                    i
                )));
            }
            previous = offset;
        }
        let data = take_slice(buffer, previous, "variable dictionary bytes")?;

        Ok(Self {
            size,
            offsets,
            data,
        })
    }

    fn element(&self, index: usize) -> &[u8] {
        let from = self.offsets.u32_at(index * 4) as usize;
        let to = self.offsets.u32_at((index + 1) * 4) as usize;
        self.data.bytes_at(from, to - from)
    }
}

impl SortedByteArraySet for VariableLengthSortedSet {
    fn size(&self) -> usize {
        self.size
    }

    fn get(&self, index: usize) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.element(index))
    }

    fn search(&self, e: &[u8], skip_equal: bool, from: usize, to: usize) -> usize {
        partition(from, to, |i| {
            let element = self.element(i);
            if skip_equal {
                element <= e
            } else {
                element < e
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{Dictionary, SortedSetBuilder};

    fn variable(values: &[&[u8]]) -> VariableLengthSortedSet {
        let mut builder = SortedSetBuilder::new();
        for v in values {
            builder.add(v);
        }
        let mut out = Vec::new();
        builder.seal().write_variable(&mut out);
        match Dictionary::decode(&mut Buffer::from_vec(out)).unwrap() {
            Dictionary::Variable(d) => d,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_variable_handles_prefixes() {
        let dict = variable(&[b"", b"a", b"ab", b"abc", b"b"]);
        assert_eq!(dict.size(), 5);
        assert_eq!(dict.index_of(b""), Some(0));
        assert_eq!(dict.index_of(b"ab"), Some(2));
        assert_eq!(dict.index_of(b"abd"), None);
        assert_eq!(dict.index_of_greater_than(b"ab", false, usize::MAX), Some(3));
        assert_eq!(dict.index_of_less_than(b"abd", false, 0), Some(3));
    }

    #[test]
    fn test_fixed_decode_rejects_short_data() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        let err = FixedLengthSortedSet::decode(&mut Buffer::from_vec(bytes)).unwrap_err();
        assert_eq!(err.code().code(), "SEAL_FORMAT_TRUNCATED");
    }

    #[test]
    fn test_variable_decode_rejects_unordered_offsets() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        for offset in [0u32, 3, 1] {
            bytes.extend_from_slice(&offset.to_le_bytes());
        }
        bytes.extend_from_slice(b"abc");
        let err = VariableLengthSortedSet::decode(&mut Buffer::from_vec(bytes)).unwrap_err();
        assert_eq!(err.code().code(), "SEAL_FORMAT_CORRUPT");
    }

    #[test]
    fn test_windowed_search() {
        let dict = variable(&[b"a", b"c", b"e", b"g"]);
        // Only [1, 3) is searched
        assert_eq!(dict.search(b"f", false, 1, 3), 3);
        assert_eq!(dict.search(b"a", false, 1, 3), 1);
        assert_eq!(dict.search(b"c", true, 1, 3), 2);
    }
}
