//! Segment registry and codec
//!
//! ```text
//! [u32 length][u32 type code][body]
//! ```
//!
//! `length` counts the type code and the body. The type code selects exactly
//! one decoder, and that decoder must consume the whole body.
//!
//! Index segment bodies:
//!
//! ```text
//! filter:        [u32 name_len][name][dictionary][multimap]
//! sortable/full: [u32 name_len][name][dictionary][multimap][u32 documents][documents × u32 rank]
//! ```

use std::fmt;

use crate::buffer::Buffer;
use crate::dictionary::{Dictionary, SortedByteArraySet, KIND_FIXED, KIND_TRIE, KIND_VARIABLE};
use crate::index::{FilterableIndex, SortableIndex};
use crate::multimap::MultiMap;

use super::codec::{put_u32, take_bytes, take_slice, take_u32};
use super::errors::{FormatError, FormatResult};
use super::payload::PayloadSegment;

/// Closed registry of segment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentType {
    Payload,
    FixedFilter,
    VariableFilter,
    FixedSortable,
    VariableSortable,
    FixedFull,
    VariableFull,
    TrieFilter,
}

impl SegmentType {
    /// Maps a stored type code to its segment type
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(SegmentType::Payload),
            2 => Some(SegmentType::FixedFilter),
            3 => Some(SegmentType::VariableFilter),
            4 => Some(SegmentType::FixedSortable),
            5 => Some(SegmentType::VariableSortable),
            6 => Some(SegmentType::FixedFull),
            7 => Some(SegmentType::VariableFull),
            8 => Some(SegmentType::TrieFilter),
            _ => None,
        }
    }

    /// Stored type code
    pub fn code(&self) -> u32 {
        match self {
            SegmentType::Payload => 1,
            SegmentType::FixedFilter => 2,
            SegmentType::VariableFilter => 3,
            SegmentType::FixedSortable => 4,
            SegmentType::VariableSortable => 5,
            SegmentType::FixedFull => 6,
            SegmentType::VariableFull => 7,
            SegmentType::TrieFilter => 8,
        }
    }

    /// Dictionary kind required by an index segment
    pub fn dictionary_kind(&self) -> Option<u32> {
        match self {
            SegmentType::Payload => None,
            SegmentType::FixedFilter | SegmentType::FixedSortable | SegmentType::FixedFull => {
                Some(KIND_FIXED)
            }
            SegmentType::VariableFilter
            | SegmentType::VariableSortable
            | SegmentType::VariableFull => Some(KIND_VARIABLE),
            SegmentType::TrieFilter => Some(KIND_TRIE),
        }
    }

    /// Whether the segment yields a filterable index
    pub fn is_filter(&self) -> bool {
        matches!(
            self,
            SegmentType::FixedFilter
                | SegmentType::VariableFilter
                | SegmentType::TrieFilter
                | SegmentType::FixedFull
                | SegmentType::VariableFull
        )
    }

    /// Whether the segment yields a sortable index
    pub fn is_sortable(&self) -> bool {
        matches!(
            self,
            SegmentType::FixedSortable
                | SegmentType::VariableSortable
                | SegmentType::FixedFull
                | SegmentType::VariableFull
        )
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SegmentType::Payload => "payload",
            SegmentType::FixedFilter => "fixed_filter",
            SegmentType::VariableFilter => "variable_filter",
            SegmentType::FixedSortable => "fixed_sortable",
            SegmentType::VariableSortable => "variable_sortable",
            SegmentType::FixedFull => "fixed_full",
            SegmentType::VariableFull => "variable_full",
            SegmentType::TrieFilter => "trie_filter",
        };
        write!(f, "{}", name)
    }
}

/// A decoded segment
#[derive(Debug, Clone)]
pub enum Segment {
    Payload(PayloadSegment),
    Filter(FilterableIndex),
    Sorter(SortableIndex),
    Full(FilterableIndex, SortableIndex),
}

/// A framed segment whose body has not been decoded yet
#[derive(Debug, Clone)]
pub struct RawSegment {
    pub kind: SegmentType,
    /// Offset of the segment frame within the body region
    pub offset: usize,
    pub body: Buffer,
}

impl RawSegment {
    /// Decodes the body. Index segments check document ids against
    /// `documents`. The body must be consumed exactly.
    pub fn decode(&self, documents: usize) -> FormatResult<Segment> {
        let mut cursor = self.body.clone();
        let segment = match self.kind {
            SegmentType::Payload => Segment::Payload(PayloadSegment::decode(&mut cursor)?),
            kind => decode_index(kind, &mut cursor, documents)?,
        };
        if cursor.remaining() != 0 {
            return Err(FormatError::corrupt(format!(
                "{} segment at byte {} has {} trailing bytes",
                self.kind,
                self.offset,
                cursor.remaining()
            )));
        }
        Ok(segment)
    }
}

fn decode_index(kind: SegmentType, cursor: &mut Buffer, documents: usize) -> FormatResult<Segment> {
    let name_bytes = take_bytes(cursor, "index name")?;
    let name = String::from_utf8(name_bytes.as_slice().to_vec())
        .map_err(|_| FormatError::corrupt("index name is not UTF-8"))?;

    let dictionary = Dictionary::decode(cursor)?;
    if Some(dictionary.kind()) != kind.dictionary_kind() {
        return Err(FormatError::corrupt(format!(
            "{} segment '{}' holds dictionary kind {}",
            kind,
            name,
            dictionary.kind()
        )));
    }
    let multimap = MultiMap::decode(cursor, documents)?;
    if multimap.keys_count() != dictionary.size() {
        return Err(FormatError::corrupt(format!(
            "index '{}' maps {} keys for {} values",
            name,
            multimap.keys_count(),
            dictionary.size()
        )));
    }

    if !kind.is_sortable() {
        return Ok(Segment::Filter(FilterableIndex::new(name, dictionary, multimap)));
    }
    let sorter = SortableIndex::decode(name.clone(), dictionary.clone(), multimap.clone(), cursor)?;
    if sorter.document_count() != documents {
        return Err(FormatError::corrupt(format!(
            "sortable index '{}' ranks {} of {} documents",
            name,
            sorter.document_count(),
            documents
        )));
    }
    if kind.is_filter() {
        Ok(Segment::Full(
            FilterableIndex::new(name, dictionary, multimap),
            sorter,
        ))
    } else {
        Ok(Segment::Sorter(sorter))
    }
}

/// Splits a body region into framed segments
pub fn split_segments(body: &Buffer) -> FormatResult<Vec<RawSegment>> {
    let mut cursor = body.clone();
    cursor.set_position(0);
    let mut segments = Vec::new();
    while cursor.remaining() > 0 {
        let offset = cursor.position();
        let length = take_u32(&mut cursor, "segment length")?;
        if length < 4 {
            return Err(FormatError::corrupt(format!(
                "segment at byte {} declares length {}",
                offset, length
            )));
        }
        let code = take_u32(&mut cursor, "segment type code")? as u32;
        let kind = SegmentType::from_code(code).ok_or_else(|| FormatError::unknown_segment(code))?;
        let body = take_slice(&mut cursor, length - 4, "segment body")?;
        segments.push(RawSegment { kind, offset, body });
    }
    Ok(segments)
}

/// Frames `body` as a segment of type `kind`
pub fn write_segment(kind: SegmentType, body: &[u8], out: &mut Vec<u8>) {
    put_u32(out, body.len() + 4);
    put_u32(out, kind.code() as usize);
    out.extend_from_slice(body);
}
