//! Random-access byte source
//!
//! A `Buffer` is a cheap-to-clone view over bytes held either in heap memory
//! or in a read-only memory-mapped file. Decoded structures keep a `Buffer`
//! over their region instead of copying, so they share the lifetime of the
//! backing bytes through reference counting.
//!
//! Addressing:
//! - absolute accessors (`u32_at`, `u64_at`, `bytes_at`) take offsets
//!   relative to the start of this view
//! - relative accessors (`read_u32`, `read_slice`, ...) consume from the
//!   cursor and return `None` when not enough bytes remain
//!
//! All integers are little-endian.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use memmap2::{Mmap, MmapOptions};

enum Backing {
    Heap(Vec<u8>),
    Mapped(Mmap),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Heap(bytes) => bytes,
            Backing::Mapped(mmap) => &mmap[..],
        }
    }
}

/// Shared view over a byte region with a read cursor
#[derive(Clone)]
pub struct Buffer {
    backing: Arc<Backing>,
    start: usize,
    end: usize,
    position: usize,
}

impl Buffer {
    /// Wraps heap bytes
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let end = bytes.len();
        Self {
            backing: Arc::new(Backing::Heap(bytes)),
            start: 0,
            end,
            position: 0,
        }
    }

    /// Maps a file read-only.
    ///
    /// The file must not be modified while any view over it is alive.
    pub fn map_file(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;
        if len == 0 {
            // Zero-length mappings are rejected on some platforms
            return Ok(Self::from_vec(Vec::new()));
        }
        // SAFETY: the mapping is read-only and the crate never writes through it
        let mmap = unsafe { MmapOptions::new().len(len).map(&file)? };
        Ok(Self {
            backing: Arc::new(Backing::Mapped(mmap)),
            start: 0,
            end: len,
            position: 0,
        })
    }

    /// Reads a whole file into heap memory
    pub fn read_file(path: &Path) -> io::Result<Self> {
        Ok(Self::from_vec(std::fs::read(path)?))
    }

    /// Returns whether this view is backed by a memory mapping
    pub fn is_mapped(&self) -> bool {
        matches!(*self.backing, Backing::Mapped(_))
    }

    /// Length of this view in bytes
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if this view has no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cursor position relative to the start of this view
    pub fn position(&self) -> usize {
        self.position - self.start
    }

    /// Moves the cursor; positions past the end are clamped
    pub fn set_position(&mut self, position: usize) {
        self.position = (self.start + position).min(self.end);
    }

    /// Bytes between the cursor and the end of the view
    pub fn remaining(&self) -> usize {
        self.end - self.position
    }

    /// The bytes of this view
    pub fn as_slice(&self) -> &[u8] {
        &self.backing.bytes()[self.start..self.end]
    }

    /// Sub-view `[offset, offset + len)`, or `None` if out of range
    pub fn slice(&self, offset: usize, len: usize) -> Option<Buffer> {
        let from = self.start.checked_add(offset)?;
        let to = from.checked_add(len)?;
        if to > self.end {
            return None;
        }
        Some(Buffer {
            backing: Arc::clone(&self.backing),
            start: from,
            end: to,
            position: from,
        })
    }

    /// Sub-view from `offset` to the end, or `None` if out of range
    pub fn slice_from(&self, offset: usize) -> Option<Buffer> {
        let len = self.len().checked_sub(offset)?;
        self.slice(offset, len)
    }

    /// Bytes `[offset, offset + len)` of this view.
    ///
    /// Panics when out of range; decoders validate regions before use.
    pub fn bytes_at(&self, offset: usize, len: usize) -> &[u8] {
        &self.as_slice()[offset..offset + len]
    }

    /// Byte at `offset`
    pub fn u8_at(&self, offset: usize) -> u8 {
        self.as_slice()[offset]
    }

    /// Little-endian u32 at `offset`
    pub fn u32_at(&self, offset: usize) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.bytes_at(offset, 4));
        u32::from_le_bytes(raw)
    }

    /// Little-endian u64 at `offset`
    pub fn u64_at(&self, offset: usize) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.bytes_at(offset, 8));
        u64::from_le_bytes(raw)
    }

    /// Reads a u32 at the cursor
    pub fn read_u32(&mut self) -> Option<u32> {
        let bytes = self.take(4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(bytes);
        Some(u32::from_le_bytes(raw))
    }

    /// Reads a u64 at the cursor
    pub fn read_u64(&mut self) -> Option<u64> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Some(u64::from_le_bytes(raw))
    }

    /// Reads `len` bytes at the cursor as a sub-view
    pub fn read_slice(&mut self, len: usize) -> Option<Buffer> {
        let view = self.slice(self.position(), len)?;
        self.position += len;
        Some(view)
    }

    /// Advances the cursor by `len` bytes
    pub fn skip(&mut self, len: usize) -> Option<()> {
        self.take(len).map(|_| ())
    }

    fn take(&mut self, len: usize) -> Option<&[u8]> {
        if self.remaining() < len {
            return None;
        }
        let from = self.position;
        self.position += len;
        Some(&self.backing.bytes()[from..from + len])
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len())
            .field("position", &self.position())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Buffer {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_relative_reads() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&9u64.to_le_bytes());
        bytes.extend_from_slice(b"abc");

        let mut buffer = Buffer::from_vec(bytes);
        assert_eq!(buffer.read_u32(), Some(7));
        assert_eq!(buffer.read_u64(), Some(9));
        assert_eq!(buffer.read_slice(3).unwrap().as_slice(), b"abc");
        assert_eq!(buffer.remaining(), 0);
        assert_eq!(buffer.read_u32(), None);
    }

    #[test]
    fn test_slice_is_relative() {
        let buffer = Buffer::from_vec(b"0123456789".to_vec());
        let view = buffer.slice(2, 5).unwrap();
        assert_eq!(view.as_slice(), b"23456");
        assert_eq!(view.u8_at(0), b'2');

        let inner = view.slice(1, 2).unwrap();
        assert_eq!(inner.as_slice(), b"34");
        assert!(view.slice(3, 3).is_none());
    }

    #[test]
    fn test_cursor_on_sub_view() {
        let buffer = Buffer::from_vec(b"xx\x01\x00\x00\x00".to_vec());
        let mut view = buffer.slice_from(2).unwrap();
        assert_eq!(view.position(), 0);
        assert_eq!(view.read_u32(), Some(1));
        assert_eq!(view.position(), 4);
    }

    #[test]
    fn test_map_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"mapped bytes").unwrap();
        file.flush().unwrap();

        let mapped = Buffer::map_file(file.path()).unwrap();
        assert!(mapped.is_mapped());
        assert_eq!(mapped.as_slice(), b"mapped bytes");

        let heap = Buffer::read_file(file.path()).unwrap();
        assert!(!heap.is_mapped());
        assert_eq!(heap, mapped);
    }

    #[test]
    fn test_map_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mapped = Buffer::map_file(file.path()).unwrap();
        assert!(mapped.is_empty());
    }
}
