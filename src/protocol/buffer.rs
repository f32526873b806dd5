//! Buffer utilities for reading XDR-encoded protocol data.
//!
//! Every XDR item is big-endian and occupies a multiple of four bytes;
//! opaque data and strings are padded with zeros up to that boundary.

use crate::error::{Error, Result};
use bytes::Bytes;

/// Number of padding bytes that follow `len` bytes of opaque data.
#[inline]
pub const fn xdr_padding(len: usize) -> usize {
    (4 - (len & 3)) & 3
}

/// A buffer for reading XDR protocol data.
#[derive(Debug, Clone)]
pub struct ReadBuffer {
    data: Bytes,
    pos: usize,
}

impl ReadBuffer {
    /// Create a new read buffer from bytes.
    pub fn new(data: Bytes) -> Self {
        Self { data, pos: 0 }
    }

    /// Get the current position in the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get the remaining bytes in the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Check if the buffer has at least `n` bytes remaining.
    pub fn has_remaining(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    /// Get a slice of the remaining data.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    #[track_caller]
    fn ensure(&self, n: usize) -> Result<()> {
        if !self.has_remaining(n) {
            return Err(Error::BufferTooSmall {
                needed: n,
                available: self.remaining(),
                location: std::panic::Location::caller(),
            });
        }
        Ok(())
    }

    /// Skip `n` bytes.
    #[track_caller]
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Read a single byte.
    #[track_caller]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let val = self.data[self.pos];
        self.pos += 1;
        Ok(val)
    }

    /// Read a big-endian i32.
    #[track_caller]
    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(i32::from_be_bytes(bytes))
    }

    /// Read a big-endian u32.
    #[track_caller]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_i32().map(|v| v as u32)
    }

    /// Read a big-endian i64.
    #[track_caller]
    pub fn read_i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[self.pos..self.pos + 8]);
        self.pos += 8;
        Ok(i64::from_be_bytes(bytes))
    }

    /// Read an IEEE single.
    #[track_caller]
    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_u32().map(f32::from_bits)
    }

    /// Read an IEEE double.
    #[track_caller]
    pub fn read_f64(&mut self) -> Result<f64> {
        self.read_i64().map(|v| f64::from_bits(v as u64))
    }

    /// Read raw bytes without padding.
    #[track_caller]
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        self.ensure(n)?;
        let bytes = self.data.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(bytes)
    }

    /// Read `n` bytes of opaque data followed by XDR padding.
    #[track_caller]
    pub fn read_opaque(&mut self, n: usize) -> Result<Bytes> {
        let bytes = self.read_bytes(n)?;
        self.skip(xdr_padding(n))?;
        Ok(bytes)
    }

    /// Read a length-prefixed opaque buffer.
    #[track_caller]
    pub fn read_buffer(&mut self) -> Result<Bytes> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(Error::protocol(format!("Negative buffer length: {}", len)));
        }
        self.read_opaque(len as usize)
    }

    /// Read a length-prefixed string.
    /// Uses lossy UTF-8 conversion; status vector text is plain ASCII.
    #[track_caller]
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_buffer()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Decode a little-endian ("VAX") integer of 1..=8 bytes, as used in
/// info and parameter buffers. Four-byte values are signed; shorter ones
/// are unsigned lengths or counts.
pub fn vax_integer(bytes: &[u8]) -> i64 {
    let mut value: u64 = 0;
    for (shift, byte) in bytes.iter().take(8).enumerate() {
        value |= (*byte as u64) << (shift * 8);
    }
    match bytes.len() {
        4 => value as u32 as i32 as i64,
        _ => value as i64,
    }
}
