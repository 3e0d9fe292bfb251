//! Payload segment: the opaque blob of every document
//!
//! ```text
//! [u32 documents][(documents + 1) × u64 offsets][payload bytes]
//! ```
//!
//! Document `i` spans `offsets[i]..offsets[i + 1]` of the payload bytes.

use crate::buffer::Buffer;

use super::codec::{put_u32, put_u64, table_len, take_slice, take_u32};
use super::errors::{FormatError, FormatResult};

/// Decoded payload segment
#[derive(Debug, Clone)]
pub struct PayloadSegment {
    documents: usize,
    offsets: Buffer,
    data: Buffer,
}

impl PayloadSegment {
    /// Decodes a payload segment body
    pub fn decode(buffer: &mut Buffer) -> FormatResult<Self> {
        let documents = take_u32(buffer, "payload document count")?;
        let entries = documents + 1;
        let offsets_len = table_len(entries, 8, "payload offsets")?;
        let offsets = take_slice(buffer, offsets_len, "payload offsets")?;

        let mut previous = 0u64;
        for i in 0..entries {
            let offset = offsets.u64_at(i * 8);
            if (i == 0 && offset != 0) || offset < previous {
                return Err(FormatError::corrupt(format!(
                    "payload offset {} out of order",
                    i
                )));
            }
            previous = offset;
        }
        let data_len = usize::try_from(previous)
            .map_err(|_| FormatError::corrupt("payload larger than address space"))?;
        let data = take_slice(buffer, data_len, "payload bytes")?;

        Ok(Self {
            documents,
            offsets,
            data,
        })
    }

    /// Number of documents
    pub fn document_count(&self) -> usize {
        self.documents
    }

    /// Payload of `document`, or `None` if out of range
    pub fn get(&self, document: usize) -> Option<Buffer> {
        if document >= self.documents {
            return None;
        }
        let from = self.offsets.u64_at(document * 8) as usize;
        let to = self.offsets.u64_at((document + 1) * 8) as usize;
        self.data.slice(from, to - from)
    }

    /// Total payload bytes
    pub fn data_len(&self) -> usize {
        self.data.len()
    }
}

/// Writes a payload segment body
pub fn write_payload<P: AsRef<[u8]>>(payloads: &[P], out: &mut Vec<u8>) {
    put_u32(out, payloads.len());
    let mut offset = 0u64;
    put_u64(out, offset);
    for payload in payloads {
        offset += payload.as_ref().len() as u64;
        put_u64(out, offset);
    }
    for payload in payloads {
        out.extend_from_slice(payload.as_ref());
    }
}
