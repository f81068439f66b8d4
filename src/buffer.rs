//! Growable owned byte buffer passed between codec and cipher stages.
//!
//! `ByteBuffer` wraps a `Vec<u8>` but controls growth itself: when an append
//! does not fit, capacity jumps to at least 8 KiB and doubles afterwards, so a
//! stream of small token writes costs amortised O(1). Allocation failures are
//! reported as [`Error::Memory`](crate::error::Error::Memory) instead of aborting.

use crate::error::Result;
use std::ops::Deref;

/// Smallest capacity a buffer grows to once it needs to grow at all.
pub const MIN_GROWTH: usize = 8192;

/// An exclusively owned byte sequence with explicit length and capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    /// Creates an empty buffer without allocating.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Creates an empty buffer able to hold `capacity` bytes without growing.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)?;
        Ok(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Gives up ownership of the underlying bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Makes room for `additional` more bytes, growing geometrically.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let needed = self.data.len().saturating_add(additional);
        if needed <= self.data.capacity() {
            return Ok(());
        }
        let grown = if self.data.capacity() < MIN_GROWTH {
            MIN_GROWTH
        } else {
            self.data.capacity().saturating_mul(2)
        };
        let target = grown.max(needed);
        self.data.try_reserve_exact(target - self.data.len())?;
        Ok(())
    }

    pub fn push(&mut self, byte: u8) -> Result<()> {
        self.reserve(1)?;
        self.data.push(byte);
        Ok(())
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Appends `count` copies of `value`.
    pub fn fill(&mut self, value: u8, count: usize) -> Result<()> {
        self.reserve(count)?;
        self.data.resize(self.data.len() + count, value);
        Ok(())
    }

    /// Appends `length` bytes copied from `distance` bytes back, one byte at a
    /// time so the source may overlap the bytes being written.
    ///
    /// The caller guarantees `1 <= distance <= self.len()`.
    pub fn copy_back(&mut self, distance: usize, length: usize) -> Result<()> {
        self.reserve(length)?;
        let start = self.data.len() - distance;
        for i in 0..length {
            let byte = self.data[start + i];
            self.data.push(byte);
        }
        Ok(())
    }

    pub fn put_u64_le(&mut self, value: u64) -> Result<()> {
        self.extend_from_slice(&value.to_le_bytes())
    }

    pub fn put_u64_be(&mut self, value: u64) -> Result<()> {
        self.extend_from_slice(&value.to_be_bytes())
    }

    pub fn put_u32_le(&mut self, value: u32) -> Result<()> {
        self.extend_from_slice(&value.to_le_bytes())
    }

    pub fn put_u16_le(&mut self, value: u16) -> Result<()> {
        self.extend_from_slice(&value.to_le_bytes())
    }
}

impl Deref for ByteBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }
}

impl From<ByteBuffer> for Vec<u8> {
    fn from(buffer: ByteBuffer) -> Self {
        buffer.data
    }
}

/// Cursor over a container, reading fixed-width little/big-endian fields.
///
/// Every read that runs past the end of the input returns `None`; callers turn
/// that into the error class appropriate for their container.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.remaining() < n {
            return None;
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Some(slice)
    }

    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..];
        self.pos = self.data.len();
        slice
    }

    pub(crate) fn u64_le(&mut self) -> Option<u64> {
        self.array::<8>().map(u64::from_le_bytes)
    }

    pub(crate) fn u64_be(&mut self) -> Option<u64> {
        self.array::<8>().map(u64::from_be_bytes)
    }

    pub(crate) fn u32_le(&mut self) -> Option<u32> {
        self.array::<4>().map(u32::from_le_bytes)
    }

    pub(crate) fn u16_le(&mut self) -> Option<u16> {
        self.array::<2>().map(u16::from_le_bytes)
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_growth_is_at_least_min() {
        let mut buf = ByteBuffer::new();
        buf.push(1).unwrap();
        assert_eq!(buf.len(), 1);
        assert!(buf.capacity() >= MIN_GROWTH);
        assert!(buf.len() <= buf.capacity());
    }

    #[test]
    fn test_growth_doubles() {
        let mut buf = ByteBuffer::new();
        buf.fill(0xAA, MIN_GROWTH).unwrap();
        let before = buf.capacity();
        buf.push(0).unwrap();
        assert!(buf.capacity() >= before * 2);
    }

    #[test]
    fn test_large_append_fits_exactly_needed() {
        let mut buf = ByteBuffer::new();
        let big = vec![7u8; MIN_GROWTH * 3];
        buf.extend_from_slice(&big).unwrap();
        assert_eq!(buf.as_slice(), &big[..]);
    }

    #[test]
    fn test_copy_back_overlapping() {
        let mut buf = ByteBuffer::from(b"ab".to_vec());
        buf.copy_back(2, 5).unwrap();
        assert_eq!(buf.as_slice(), b"abababa");
    }

    #[test]
    fn test_impossible_capacity_is_memory_error() {
        let err = ByteBuffer::with_capacity(usize::MAX).unwrap_err();
        assert!(matches!(err, crate::error::Error::Memory(_)));
    }

    #[test]
    fn test_reader_fields() {
        let mut buf = ByteBuffer::new();
        buf.put_u64_le(0x0102_0304_0506_0708).unwrap();
        buf.put_u64_be(42).unwrap();
        buf.put_u32_le(9).unwrap();
        buf.put_u16_le(0xBEEF).unwrap();
        buf.push(0xFF).unwrap();

        let mut r = Reader::new(&buf);
        assert_eq!(r.u64_le(), Some(0x0102_0304_0506_0708));
        assert_eq!(r.u64_be(), Some(42));
        assert_eq!(r.u32_le(), Some(9));
        assert_eq!(r.u16_le(), Some(0xBEEF));
        assert_eq!(r.remaining(), 1);
        assert_eq!(r.u16_le(), None);
        assert_eq!(r.rest(), &[0xFF]);
    }
}
