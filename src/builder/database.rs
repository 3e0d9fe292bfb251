//! Database accumulation, sealing and serialization
//!
//! Documents are numbered in insertion order. `seal` freezes every field's
//! dictionary, resolves ranks, picks each multimap's encoding by size and
//! frames the segments. The sealed bytes are then written once, with the
//! digest computed as they stream out.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use crate::dictionary::{SortedSetBuilder, KIND_FIXED, KIND_TRIE};
use crate::format::codec::{put_bytes, put_u32};
use crate::format::{
    compute_digest, write_header, write_payload, write_segment, DigestWriter, SegmentType,
    DIGEST_LEN, HEADER_LEN,
};
use crate::index::NO_RANK;
use crate::multimap::MultiMapBuilder;
use crate::observability::{log_event_with_fields, Event, ObservationScope};

use super::document::DocumentBuilder;
use super::errors::{BuildError, BuildResult};
use super::{IndexOption, LengthHint};

/// Most documents one database can hold; ids and counts are stored as u32
/// and `u32::MAX` marks a missing rank
pub const MAX_DOCUMENTS: usize = NO_RANK as usize;

/// Values of one field across all documents
#[derive(Debug)]
struct FieldColumn {
    option: IndexOption,
    hint: LengthHint,
    width: Option<usize>,
    values: SortedSetBuilder,
    postings: Vec<(usize, Arc<[u8]>)>,
}

impl FieldColumn {
    fn segment_type(&self) -> SegmentType {
        match (self.option, self.hint) {
            (IndexOption::TrieFilterable, _) => SegmentType::TrieFilter,
            (IndexOption::Filterable, LengthHint::Fixed) => SegmentType::FixedFilter,
            (IndexOption::Filterable, LengthHint::Variable) => SegmentType::VariableFilter,
            (IndexOption::Sortable, LengthHint::Fixed) => SegmentType::FixedSortable,
            (IndexOption::Sortable, LengthHint::Variable) => SegmentType::VariableSortable,
            (IndexOption::Full, LengthHint::Fixed) => SegmentType::FixedFull,
            (IndexOption::Full, LengthHint::Variable) => SegmentType::VariableFull,
        }
    }
}

/// Accumulates documents for one sealed database
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    payloads: Vec<Vec<u8>>,
    columns: BTreeMap<String, FieldColumn>,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents added
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Adds a document and returns its id.
    ///
    /// Every check runs before anything is recorded, so a rejected document
    /// leaves the builder unchanged.
    pub fn add(&mut self, document: DocumentBuilder) -> BuildResult<usize> {
        let DocumentBuilder { fields, payload } = document;
        let Some(payload) = payload else {
            return Err(BuildError::missing_payload());
        };
        let id = self.payloads.len();
        if id >= MAX_DOCUMENTS {
            return Err(BuildError::too_many_documents(MAX_DOCUMENTS));
        }

        // Widths fixed by this document, for fields seen for the first time
        let mut new_widths: BTreeMap<&str, usize> = BTreeMap::new();
        for field in &fields {
            let known = self.columns.get(&field.name);
            if let Some(column) = known {
                if column.option != field.option || column.hint != field.hint {
                    return Err(BuildError::field(
                        field.name.as_str(),
                        "conflicting index options",
                    ));
                }
            }
            if field.hint == LengthHint::Fixed && field.option != IndexOption::TrieFilterable {
                let expected = known
                    .and_then(|c| c.width)
                    .or_else(|| new_widths.get(field.name.as_str()).copied());
                match expected {
                    Some(width) if width != field.value.len() => {
                        return Err(BuildError::field(
                            field.name.as_str(),
                            format!("fixed length {}, got {}", width, field.value.len()),
                        ));
                    }
                    Some(_) => {}
                    None => {
                        new_widths.insert(field.name.as_str(), field.value.len());
                    }
                }
            }
        }

        for field in fields {
            let column = self
                .columns
                .entry(field.name)
                .or_insert_with(|| FieldColumn {
                    option: field.option,
                    hint: field.hint,
                    width: None,
                    values: SortedSetBuilder::new(),
                    postings: Vec::new(),
                });
            if column.hint == LengthHint::Fixed && column.option != IndexOption::TrieFilterable {
                column.width = Some(field.value.len());
            }
            let stored = column.values.add(&field.value);
            column.postings.push((id, stored));
        }
        self.payloads.push(payload);
        Ok(id)
    }

    /// Freezes the builder into serialized segments
    pub fn seal(self) -> BuildResult<SealedDatabase> {
        let documents = self.payloads.len();
        let mut body = Vec::new();

        let mut payload_body = Vec::new();
        write_payload(&self.payloads, &mut payload_body);
        write_segment(SegmentType::Payload, &payload_body, &mut body);

        let fields = self.columns.len();
        for (name, column) in self.columns {
            let kind = column.segment_type();
            let values = column.values.seal();

            let mut multimap = MultiMapBuilder::new(values.len(), documents);
            let mut ranks = vec![NO_RANK; documents];
            for (doc, value) in &column.postings {
                let Some(rank) = values.index_of(value) else {
                    return Err(BuildError::field(name, "value missing from sealed dictionary"));
                };
                multimap.put(rank, *doc);
                ranks[*doc] = rank as u32;
            }

            let mut segment = Vec::new();
            put_bytes(&mut segment, name.as_bytes());
            match kind.dictionary_kind() {
                Some(KIND_FIXED) => values.write_fixed(&mut segment),
                Some(KIND_TRIE) => values.write_trie(&mut segment),
                _ => values.write_variable(&mut segment),
            }
            multimap.write(&mut segment);
            if kind.is_sortable() {
                put_u32(&mut segment, documents);
                for rank in &ranks {
                    segment.extend_from_slice(&rank.to_le_bytes());
                }
            }
            write_segment(kind, &segment, &mut body);
        }

        let sealed = SealedDatabase {
            documents,
            fields,
            body: Arc::from(body),
        };
        log_event_with_fields(
            Event::DbSealed,
            &[
                ("documents", documents.to_string().as_str()),
                ("fields", fields.to_string().as_str()),
                ("bytes", sealed.size_in_bytes().to_string().as_str()),
            ],
        );
        Ok(sealed)
    }
}

/// An immutable, serialized database
#[derive(Debug, Clone)]
pub struct SealedDatabase {
    documents: usize,
    fields: usize,
    body: Arc<[u8]>,
}

impl SealedDatabase {
    pub fn document_count(&self) -> usize {
        self.documents
    }

    /// Number of indexed fields
    pub fn field_count(&self) -> usize {
        self.fields
    }

    /// Exact length of the serialized form
    pub fn size_in_bytes(&self) -> usize {
        HEADER_LEN + self.body.len() + DIGEST_LEN
    }

    /// Writes header, segments and digest; returns the bytes written
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<usize> {
        let scope = ObservationScope::new("DB_WRITE");
        match self.write_frame(out) {
            Ok(written) => {
                let bytes = written.to_string();
                scope.complete_with_fields(&[("bytes", bytes.as_str())]);
                log_event_with_fields(Event::DbWritten, &[("bytes", bytes.as_str())]);
                Ok(written)
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    fn write_frame<W: Write>(&self, out: &mut W) -> io::Result<usize> {
        let mut header = Vec::with_capacity(HEADER_LEN);
        write_header(&mut header);
        out.write_all(&header)?;

        let mut digesting = DigestWriter::new(out);
        digesting.write_all(&self.body)?;
        let (out, digest) = digesting.finish();
        out.write_all(&digest)?;
        out.flush()?;
        Ok(self.size_in_bytes())
    }

    /// Writes to a new file at `path` and syncs it
    pub fn write_file(&self, path: impl AsRef<Path>) -> io::Result<usize> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        let written = self.write_to(&mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(written)
    }

    /// The serialized form in memory
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size_in_bytes());
        write_header(&mut out);
        out.extend_from_slice(&self.body);
        out.extend_from_slice(&compute_digest(&self.body));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str, number: i32, payload: &str) -> DocumentBuilder {
        DocumentBuilder::new()
            .with_field("text", text, IndexOption::Full, LengthHint::Variable)
            .unwrap()
            .with_field("int", number, IndexOption::Full, LengthHint::Fixed)
            .unwrap()
            .with_payload(payload.as_bytes().to_vec())
            .unwrap()
    }

    #[test]
    fn test_ids_in_insertion_order() {
        let mut builder = DatabaseBuilder::new();
        assert_eq!(builder.add(doc("a", 1, "p0")).unwrap(), 0);
        assert_eq!(builder.add(doc("b", 2, "p1")).unwrap(), 1);
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn test_missing_payload() {
        let mut builder = DatabaseBuilder::new();
        let err = builder.add(DocumentBuilder::new()).unwrap_err();
        assert_eq!(err.code(), "SEAL_BUILD_ILLEGAL_STATE");
        assert!(builder.is_empty());
    }

    #[test]
    fn test_option_conflict_across_documents() {
        let mut builder = DatabaseBuilder::new();
        builder.add(doc("a", 1, "p0")).unwrap();
        let other = DocumentBuilder::new()
            .with_field("int", 5i32, IndexOption::Filterable, LengthHint::Fixed)
            .unwrap()
            .with_payload(vec![])
            .unwrap();
        let err = builder.add(other).unwrap_err();
        assert_eq!(err.field_name(), Some("int"));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_fixed_length_mismatch() {
        let mut builder = DatabaseBuilder::new();
        let first = DocumentBuilder::new()
            .with_field("code", "abc", IndexOption::Filterable, LengthHint::Fixed)
            .unwrap()
            .with_payload(vec![])
            .unwrap();
        let second = DocumentBuilder::new()
            .with_field("code", "abcd", IndexOption::Filterable, LengthHint::Fixed)
            .unwrap()
            .with_payload(vec![])
            .unwrap();
        builder.add(first).unwrap();
        let err = builder.add(second).unwrap_err();
        assert!(err.message().contains("fixed length 3"));
    }

    #[test]
    fn test_fixed_length_mismatch_within_document() {
        let mut builder = DatabaseBuilder::new();
        let document = DocumentBuilder::new()
            .with_field("code", "ab", IndexOption::Filterable, LengthHint::Fixed)
            .unwrap()
            .with_field("code", "abc", IndexOption::Filterable, LengthHint::Fixed)
            .unwrap()
            .with_payload(vec![])
            .unwrap();
        assert!(builder.add(document).is_err());
        assert!(builder.is_empty());
    }

    #[test]
    fn test_sealed_bytes() {
        let mut builder = DatabaseBuilder::new();
        builder.add(doc("doc1234", 1234, "payload1")).unwrap();
        builder.add(doc("doc2", 2, "payload2")).unwrap();
        let sealed = builder.seal().unwrap();

        assert_eq!(sealed.document_count(), 2);
        assert_eq!(sealed.field_count(), 2);
        let bytes = sealed.to_bytes();
        assert_eq!(bytes.len(), sealed.size_in_bytes());
        assert_eq!(&bytes[..4], b"SEAL");

        let mut written = Vec::new();
        assert_eq!(sealed.write_to(&mut written).unwrap(), bytes.len());
        assert_eq!(written, bytes);
    }

    #[test]
    fn test_sealing_is_deterministic() {
        let build = || {
            let mut builder = DatabaseBuilder::new();
            builder.add(doc("x", 3, "a")).unwrap();
            builder.add(doc("y", -3, "b")).unwrap();
            builder.seal().unwrap().to_bytes()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_empty_database() {
        let sealed = DatabaseBuilder::new().seal().unwrap();
        assert_eq!(sealed.document_count(), 0);
        assert!(sealed.size_in_bytes() > HEADER_LEN + DIGEST_LEN);
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.seal");
        let mut builder = DatabaseBuilder::new();
        builder.add(doc("a", 1, "p")).unwrap();
        let sealed = builder.seal().unwrap();
        let written = sealed.write_file(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), sealed.to_bytes());
        assert_eq!(written, sealed.size_in_bytes());
    }
}
