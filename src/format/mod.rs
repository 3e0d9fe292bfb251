//! On-disk format
//!
//! A sealed database is one contiguous byte stream:
//!
//! ```text
//! +------------------+
//! | Magic            | (u32 LE)
//! +------------------+
//! | Format Version   | (u32 LE)
//! +------------------+
//! | Segment*         | ([u32 length][u32 type code][body])
//! +------------------+
//! | Digest           | (32 bytes, SHA-256)
//! +------------------+
//! ```
//!
//! The digest covers every segment byte. The reader rejects a wrong magic,
//! any version other than `FORMAT_VERSION`, and a digest mismatch before any
//! segment is decoded.

pub(crate) mod codec;
mod digest;
mod errors;
mod payload;
mod segment;

pub use digest::{compute_digest, verify_digest, DigestWriter, DIGEST_LEN};
pub use errors::{FormatError, FormatErrorCode, FormatResult};
pub use payload::{write_payload, PayloadSegment};
pub use segment::{split_segments, write_segment, RawSegment, Segment, SegmentType};

use crate::buffer::Buffer;

/// Leading magic constant ("SEAL" read as a little-endian u32)
pub const MAGIC: u32 = u32::from_le_bytes(*b"SEAL");

/// The only format version this crate reads and writes
pub const FORMAT_VERSION: u32 = 1;

/// Magic plus version
pub const HEADER_LEN: usize = 8;

/// Writes the file header
pub fn write_header(out: &mut Vec<u8>) {
    out.extend_from_slice(&MAGIC.to_le_bytes());
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
}

/// Validates the frame of a whole file and returns the segment region.
///
/// Checks run in order: minimum length, magic, version, then the digest
/// when `verify` is set.
pub fn open_body(file: &Buffer, verify: bool) -> FormatResult<Buffer> {
    let len = file.len();
    if len < HEADER_LEN + DIGEST_LEN {
        return Err(FormatError::truncated(
            len,
            format!(
                "{} bytes is shorter than header and digest ({})",
                len,
                HEADER_LEN + DIGEST_LEN
            ),
        ));
    }

    let magic = file.u32_at(0);
    if magic != MAGIC {
        return Err(FormatError::bad_magic(magic));
    }
    let version = file.u32_at(4);
    if version != FORMAT_VERSION {
        return Err(FormatError::unsupported_version(version, FORMAT_VERSION));
    }

    let body_len = len - HEADER_LEN - DIGEST_LEN;
    let body = file
        .slice(HEADER_LEN, body_len)
        .ok_or_else(|| FormatError::truncated(HEADER_LEN, "segment region"))?;
    if verify {
        let stored = file.bytes_at(len - DIGEST_LEN, DIGEST_LEN);
        if !verify_digest(body.as_slice(), stored) {
            return Err(FormatError::digest_mismatch());
        }
    }
    Ok(body)
}
