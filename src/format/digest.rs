//! SHA-256 body digest
//!
//! The digest covers every byte after the file header up to, not including,
//! the digest itself. It is computed while the body is written and verified
//! by re-digesting on open.

use std::io::{self, Write};

use sha2::{Digest, Sha256};

/// Digest width in bytes
pub const DIGEST_LEN: usize = 32;

/// Computes the digest of `data`
pub fn compute_digest(data: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    to_array(hasher)
}

fn to_array(hasher: Sha256) -> [u8; DIGEST_LEN] {
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// Verifies that `data` digests to `expected`
pub fn verify_digest(data: &[u8], expected: &[u8]) -> bool {
    expected.len() == DIGEST_LEN && compute_digest(data)[..] == *expected
}

/// Writer that digests everything passing through it
pub struct DigestWriter<W: Write> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Bytes written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Returns the inner writer and the digest of everything written
    pub fn finish(self) -> (W, [u8; DIGEST_LEN]) {
        (self.inner, to_array(self.hasher))
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_deterministic() {
        let data = b"sealed body bytes";
        assert_eq!(compute_digest(data), compute_digest(data));
    }

    #[test]
    fn test_digest_detects_corruption() {
        let mut data = vec![0x00, 0x01, 0x02, 0x03, 0x04];
        let original = compute_digest(&data);
        data[2] ^= 0x01;
        assert_ne!(original, compute_digest(&data));
    }

    #[test]
    fn test_verify_digest() {
        let data = b"payload";
        let digest = compute_digest(data);
        assert!(verify_digest(data, &digest));
        assert!(!verify_digest(b"payloaD", &digest));
        assert!(!verify_digest(data, &digest[..16]));
    }

    #[test]
    fn test_writer_matches_one_shot() {
        let mut writer = DigestWriter::new(Vec::new());
        writer.write_all(b"first ").unwrap();
        writer.write_all(b"second").unwrap();
        assert_eq!(writer.written(), 12);
        let (bytes, digest) = writer.finish();
        assert_eq!(bytes, b"first second");
        assert_eq!(digest, compute_digest(b"first second"));
    }
}
