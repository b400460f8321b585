//! Binary reading and writing utilities for the arena protocol.
//!
//! All values are little-endian. Reads are bounds-checked so a truncated
//! packet surfaces as [`ProtocolError::UnexpectedEof`] instead of a panic.

use crate::ProtocolError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// A reader for parsing binary protocol messages.
#[derive(Debug)]
pub struct BinaryReader {
    buf: Bytes,
}

impl BinaryReader {
    /// Create a new reader from raw bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { buf: data.into() }
    }

    /// Returns remaining bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    #[inline]
    fn ensure(&self, n: usize) -> Result<(), ProtocolError> {
        if self.buf.remaining() >= n {
            Ok(())
        } else {
            Err(ProtocolError::UnexpectedEof)
        }
    }

    #[inline]
    pub fn get_u8(&mut self) -> Result<u8, ProtocolError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    #[inline]
    pub fn get_u32(&mut self) -> Result<u32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    #[inline]
    pub fn get_f32(&mut self) -> Result<f32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_f32_le())
    }

    /// Read a NUL-terminated UTF-8 string.
    ///
    /// A missing terminator is tolerated at the end of the buffer.
    pub fn get_string_utf8(&mut self) -> String {
        let mut bytes = Vec::new();
        while self.buf.has_remaining() {
            let b = self.buf.get_u8();
            if b == 0 {
                break;
            }
            bytes.push(b);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Read a `u32` length prefix followed by that many raw bytes.
    pub fn get_blob(&mut self) -> Result<Bytes, ProtocolError> {
        let len = self.get_u32()? as usize;
        self.ensure(len)?;
        Ok(self.buf.split_to(len))
    }

    /// Take everything that is left.
    pub fn get_rest(&mut self) -> Bytes {
        let len = self.buf.remaining();
        self.buf.split_to(len)
    }
}

/// A writer for building binary protocol messages.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buf: BytesMut,
}

impl BinaryWriter {
    /// Create a new writer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Create a new writer with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    #[inline]
    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    #[inline]
    pub fn put_f32(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    /// Write a NUL-terminated UTF-8 string.
    ///
    /// Interior NUL bytes would truncate the string on the reading side, so
    /// they are dropped.
    pub fn put_string_utf8(&mut self, s: &str) {
        self.buf.extend(s.bytes().filter(|&b| b != 0));
        self.buf.put_u8(0);
    }

    /// Write a `u32` length prefix followed by the raw bytes.
    pub fn put_blob(&mut self, data: &[u8]) {
        self.buf.put_u32_le(data.len() as u32);
        self.buf.put_slice(data);
    }

    /// Write raw bytes.
    pub fn put_slice(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    /// Consume the writer and return the built buffer.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    /// Get current buffer as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_read_is_an_error() {
        let mut r = BinaryReader::new(vec![0x01, 0x02]);
        assert_eq!(r.get_u32(), Err(ProtocolError::UnexpectedEof));
    }

    #[test]
    fn test_string_utf8_drops_interior_nul() {
        let mut w = BinaryWriter::new();
        w.put_string_utf8("ab\0c");
        w.put_u8(7);
        let mut r = BinaryReader::new(w.finish());
        assert_eq!(r.get_string_utf8(), "abc");
        assert_eq!(r.get_u8(), Ok(7));
    }

    #[test]
    fn test_blob_length_checked() {
        let mut w = BinaryWriter::new();
        w.put_u32(10);
        w.put_slice(b"short");
        let mut r = BinaryReader::new(w.finish());
        assert_eq!(r.get_blob(), Err(ProtocolError::UnexpectedEof));
    }
}
