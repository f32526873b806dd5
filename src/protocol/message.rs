//! Message traits and builders for XDR request serialization.
//!
//! Messages implement the `Message` trait, which computes the wire size up
//! front so a request payload is serialized with a single allocation.

use crate::error::Result;
use crate::protocol::buffer::xdr_padding;

// ============================================================================
// Core Traits
// ============================================================================

/// A request that can calculate its wire size and serialize to bytes.
///
/// 1. Call `wire_size()` to determine buffer capacity needed
/// 2. Allocate buffer with exact capacity
/// 3. Call `write_to()` to serialize directly into buffer
pub trait Message {
    /// Operation code sent ahead of the payload.
    fn op(&self) -> u32;

    /// Calculate the serialized payload size in bytes (excluding the op code).
    fn wire_size(&self) -> usize;

    /// Write message content to buffer.
    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()>;

    /// Serialize into a freshly allocated payload.
    fn to_payload(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.wire_size());
        self.write_to(&mut buf)?;
        Ok(buf)
    }
}

// ============================================================================
// Size Calculation Helpers
// ============================================================================

/// Wire size of a 4-byte XDR integer.
pub const INT_WIRE_SIZE: usize = 4;

/// Wire size of an 8-byte XDR hyper integer.
pub const LONG_WIRE_SIZE: usize = 8;

/// Wire size of opaque data of `len` bytes (no length prefix).
#[inline]
pub const fn opaque_wire_size(len: usize) -> usize {
    len + xdr_padding(len)
}

/// Wire size of a length-prefixed XDR buffer.
#[inline]
pub const fn buffer_wire_size(len: usize) -> usize {
    INT_WIRE_SIZE + opaque_wire_size(len)
}

// ============================================================================
// Write Helpers
// ============================================================================

/// Extension trait for writing XDR protocol data to `Vec<u8>`.
pub trait WriteExt {
    /// Write a big-endian i32.
    fn write_i32(&mut self, val: i32);

    /// Write a big-endian u32.
    fn write_u32(&mut self, val: u32);

    /// Write a big-endian i64.
    fn write_i64(&mut self, val: i64);

    /// Write an IEEE single.
    fn write_f32(&mut self, val: f32);

    /// Write an IEEE double.
    fn write_f64(&mut self, val: f64);

    /// Write opaque bytes followed by XDR padding.
    fn write_opaque(&mut self, bytes: &[u8]);

    /// Write a length-prefixed opaque buffer.
    fn write_buffer(&mut self, bytes: &[u8]);

    /// Write a length-prefixed string.
    fn write_str(&mut self, s: &str);

    /// Write zeros.
    fn write_zeros(&mut self, count: usize);
}

impl WriteExt for Vec<u8> {
    #[inline]
    fn write_i32(&mut self, val: i32) {
        self.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    fn write_u32(&mut self, val: u32) {
        self.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    fn write_i64(&mut self, val: i64) {
        self.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    fn write_f32(&mut self, val: f32) {
        self.extend_from_slice(&val.to_bits().to_be_bytes());
    }

    #[inline]
    fn write_f64(&mut self, val: f64) {
        self.extend_from_slice(&val.to_bits().to_be_bytes());
    }

    fn write_opaque(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
        self.write_zeros(xdr_padding(bytes.len()));
    }

    fn write_buffer(&mut self, bytes: &[u8]) {
        self.write_i32(bytes.len() as i32);
        self.write_opaque(bytes);
    }

    #[inline]
    fn write_str(&mut self, s: &str) {
        self.write_buffer(s.as_bytes());
    }

    #[inline]
    fn write_zeros(&mut self, count: usize) {
        self.resize(self.len() + count, 0);
    }
}

// ============================================================================
// Tests
// ============================================================================
