//! Little-endian field helpers shared by every segment codec

use crate::buffer::Buffer;

use super::errors::{FormatError, FormatResult};

/// Appends `value` as a u32.
///
/// Callers bound their values to u32 before serializing.
pub(crate) fn put_u32(out: &mut Vec<u8>, value: usize) {
    out.extend_from_slice(&(value as u32).to_le_bytes());
}

/// Appends `value` as a u64
pub(crate) fn put_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Appends a u32 length prefix followed by `bytes`
pub(crate) fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    put_u32(out, bytes.len());
    out.extend_from_slice(bytes);
}

/// Reads a u32 at the cursor
pub(crate) fn take_u32(buffer: &mut Buffer, what: &str) -> FormatResult<usize> {
    let at = buffer.position();
    buffer
        .read_u32()
        .map(|v| v as usize)
        .ok_or_else(|| FormatError::truncated(at, what))
}

/// Reads `len` bytes at the cursor as a sub-view
pub(crate) fn take_slice(buffer: &mut Buffer, len: usize, what: &str) -> FormatResult<Buffer> {
    let at = buffer.position();
    buffer
        .read_slice(len)
        .ok_or_else(|| FormatError::truncated(at, what))
}

/// Reads a u32 length prefix and the bytes it announces
pub(crate) fn take_bytes(buffer: &mut Buffer, what: &str) -> FormatResult<Buffer> {
    let len = take_u32(buffer, what)?;
    take_slice(buffer, len, what)
}

/// Byte length of `count` entries of `width` bytes, rejecting overflow
pub(crate) fn table_len(count: usize, width: usize, what: &str) -> FormatResult<usize> {
    count
        .checked_mul(width)
        .ok_or_else(|| FormatError::corrupt(format!("{} table too large", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_take() {
        let mut out = Vec::new();
        put_u32(&mut out, 3);
        put_bytes(&mut out, b"abc");
        put_u64(&mut out, 9);

        let mut buffer = Buffer::from_vec(out);
        assert_eq!(take_u32(&mut buffer, "count").unwrap(), 3);
        assert_eq!(take_bytes(&mut buffer, "name").unwrap().as_slice(), b"abc");
        assert_eq!(buffer.read_u64(), Some(9));
    }

    #[test]
    fn test_take_reports_truncation() {
        let mut buffer = Buffer::from_vec(vec![1, 0]);
        let err = take_u32(&mut buffer, "count").unwrap_err();
        assert_eq!(err.code().code(), "SEAL_FORMAT_TRUNCATED");
    }
}
