//! Tag-length-value parameter buffers (DPB, TPB, EPB, BPB, SPB).
//!
//! Every entry is one tag byte, a length (one byte, or two little-endian bytes
//! for service buffers) and the payload. Integer payloads follow the buffer's
//! byte order. Duplicate tags are legal; the server reads them in order.

use bytes::Bytes;

use crate::protocol::constants::*;

/// Byte order for multi-byte integer payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// Network order (big-endian).
    Big,
    /// Little-endian.
    Little,
}

/// Width of the length field written after each tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthWidth {
    One,
    Two,
}

/// Generic append-only parameter buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterBuffer {
    data: Vec<u8>,
    endianness: Endianness,
    length_width: LengthWidth,
}

impl ParameterBuffer {
    /// Create an empty buffer with the given layout.
    pub fn new(endianness: Endianness, length_width: LengthWidth) -> Self {
        Self {
            data: Vec::new(),
            endianness,
            length_width,
        }
    }

    /// Byte order of integer payloads.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Append a bare byte (version markers and flag tags).
    pub fn append_tag(&mut self, tag: u8) -> &mut Self {
        self.data.push(tag);
        self
    }

    /// Largest payload the length prefix can describe.
    pub fn max_item_len(&self) -> usize {
        match self.length_width {
            LengthWidth::One => u8::MAX as usize,
            LengthWidth::Two => u16::MAX as usize,
        }
    }

    fn write_length(&mut self, len: usize) {
        match self.length_width {
            LengthWidth::One => self.data.push(len as u8),
            LengthWidth::Two => self.data.extend_from_slice(&(len as u16).to_le_bytes()),
        }
    }

    /// Append a one-byte value.
    pub fn append_u8(&mut self, tag: u8, value: u8) -> &mut Self {
        self.data.push(tag);
        self.write_length(1);
        self.data.push(value);
        self
    }

    /// Append a two-byte integer.
    pub fn append_i16(&mut self, tag: u8, value: i16) -> &mut Self {
        self.data.push(tag);
        self.write_length(2);
        match self.endianness {
            Endianness::Big => self.data.extend_from_slice(&value.to_be_bytes()),
            Endianness::Little => self.data.extend_from_slice(&value.to_le_bytes()),
        }
        self
    }

    /// Append a four-byte integer.
    pub fn append_i32(&mut self, tag: u8, value: i32) -> &mut Self {
        self.data.push(tag);
        self.write_length(4);
        match self.endianness {
            Endianness::Big => self.data.extend_from_slice(&value.to_be_bytes()),
            Endianness::Little => self.data.extend_from_slice(&value.to_le_bytes()),
        }
        self
    }

    /// Append a string payload (bytes as given; callers encode beforehand
    /// when a specific charset is required).
    pub fn append_str(&mut self, tag: u8, value: &str) -> &mut Self {
        self.append_bytes(tag, value.as_bytes())
    }

    /// Append raw bytes. Payloads longer than [`max_item_len`] are
    /// truncated so the length prefix stays accurate.
    ///
    /// [`max_item_len`]: ParameterBuffer::max_item_len
    pub fn append_bytes(&mut self, tag: u8, value: &[u8]) -> &mut Self {
        let max = self.max_item_len();
        let value = if value.len() > max {
            tracing::warn!(tag, len = value.len(), max, "parameter truncated");
            &value[..max]
        } else {
            value
        };
        self.data.push(tag);
        self.write_length(value.len());
        self.data.extend_from_slice(value);
        self
    }

    /// Append raw bytes without tag or length.
    pub(crate) fn append_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.data.extend_from_slice(bytes);
        self
    }

    /// Append a raw integer without tag or length, in buffer byte order.
    pub(crate) fn append_raw_i32(&mut self, value: i32) -> &mut Self {
        match self.endianness {
            Endianness::Big => self.data.extend_from_slice(&value.to_be_bytes()),
            Endianness::Little => self.data.extend_from_slice(&value.to_le_bytes()),
        }
        self
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the accumulated bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Immutable snapshot of the accumulated bytes.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.data)
    }
}

macro_rules! specialized_buffer {
    ($(#[$meta:meta])* $name:ident, $endianness:expr, $width:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(ParameterBuffer);

        impl std::ops::Deref for $name {
            type Target = ParameterBuffer;

            fn deref(&self) -> &ParameterBuffer {
                &self.0
            }
        }

        impl std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut ParameterBuffer {
                &mut self.0
            }
        }

        impl $name {
            /// Create an empty buffer (no version byte).
            pub fn empty() -> Self {
                Self(ParameterBuffer::new($endianness, $width))
            }
        }
    };
}

specialized_buffer!(
    /// Database parameter buffer sent with op_attach.
    DatabaseParameterBuffer,
    Endianness::Big,
    LengthWidth::One
);

specialized_buffer!(
    /// Transaction parameter buffer sent with op_transaction.
    TransactionParameterBuffer,
    Endianness::Big,
    LengthWidth::One
);

specialized_buffer!(
    /// Event parameter buffer; counts are little-endian.
    EventParameterBuffer,
    Endianness::Little,
    LengthWidth::One
);

specialized_buffer!(
    /// Blob parameter buffer sent when opening or creating a blob.
    BlobParameterBuffer,
    Endianness::Big,
    LengthWidth::One
);

specialized_buffer!(
    /// Service parameter buffer; string lengths take two bytes.
    ServiceParameterBuffer,
    Endianness::Little,
    LengthWidth::Two
);

impl DatabaseParameterBuffer {
    /// New buffer starting with isc_dpb_version1.
    pub fn new() -> Self {
        let mut dpb = Self::empty();
        dpb.append_tag(ISC_DPB_VERSION1);
        dpb
    }
}

impl Default for DatabaseParameterBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionParameterBuffer {
    /// New buffer starting with isc_tpb_version3.
    pub fn new() -> Self {
        let mut tpb = Self::empty();
        tpb.append_tag(ISC_TPB_VERSION3);
        tpb
    }

    /// Read-committed, read-write, waiting transaction.
    pub fn read_committed() -> Self {
        let mut tpb = Self::new();
        tpb.append_tag(ISC_TPB_WRITE)
            .append_tag(ISC_TPB_READ_COMMITTED)
            .append_tag(ISC_TPB_REC_VERSION)
            .append_tag(ISC_TPB_WAIT);
        tpb
    }

    /// Reserve a table for shared or protected access.
    pub fn lock_table(&mut self, table: &str, write: bool) -> &mut Self {
        let tag = if write {
            ISC_TPB_LOCK_WRITE
        } else {
            ISC_TPB_LOCK_READ
        };
        self.append_str(tag, table);
        self
    }
}

impl Default for TransactionParameterBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl EventParameterBuffer {
    /// Build an EPB listing each event name with its last known count.
    pub fn with_events<'a>(events: impl IntoIterator<Item = (&'a str, i32)>) -> Self {
        let mut epb = Self::empty();
        epb.append_tag(EPB_VERSION1);
        for (name, count) in events {
            // Event names are limited to 255 bytes by the one-byte length.
            let bytes = &name.as_bytes()[..name.len().min(u8::MAX as usize)];
            epb.append_raw(&[bytes.len() as u8])
                .append_raw(bytes)
                .append_raw_i32(count);
        }
        epb
    }
}

impl BlobParameterBuffer {
    /// New buffer starting with isc_bpb_version1.
    pub fn new() -> Self {
        let mut bpb = Self::empty();
        bpb.append_tag(ISC_BPB_VERSION1);
        bpb
    }
}

impl Default for BlobParameterBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceParameterBuffer {
    /// New buffer starting with the current SPB version markers.
    pub fn new() -> Self {
        let mut spb = Self::empty();
        spb.append_tag(ISC_SPB_VERSION2)
            .append_tag(ISC_SPB_CURRENT_VERSION);
        spb
    }
}

impl Default for ServiceParameterBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dpb_layout() {
        let mut dpb = DatabaseParameterBuffer::new();
        dpb.append_str(ISC_DPB_USER_NAME, "SYSDBA")
            .append_i32(ISC_DPB_SQL_DIALECT, 3);

        let mut expected = vec![ISC_DPB_VERSION1, ISC_DPB_USER_NAME, 6];
        expected.extend_from_slice(b"SYSDBA");
        expected.extend_from_slice(&[ISC_DPB_SQL_DIALECT, 4, 0, 0, 0, 3]);
        assert_eq!(dpb.as_bytes(), expected.as_slice());
        assert_eq!(dpb.len(), dpb.to_bytes().len());
    }

    #[test]
    fn test_same_appends_same_bytes() {
        let build = || {
            let mut tpb = TransactionParameterBuffer::new();
            tpb.append_tag(ISC_TPB_WRITE);
            tpb.lock_table("ORDERS", true);
            tpb.append_i16(ISC_TPB_WAIT, 10);
            tpb.lock_table("ORDERS", true);
            tpb
        };
        assert_eq!(build().to_bytes(), build().to_bytes());
        assert_eq!(build().len(), build().to_bytes().len());
    }

    #[test]
    fn test_long_payload_is_truncated_to_length_prefix() {
        let mut dpb = DatabaseParameterBuffer::new();
        dpb.append_bytes(ISC_DPB_USER_NAME, &[b'x'; 300]);
        assert_eq!(dpb.as_bytes()[2], 255);
        assert_eq!(dpb.len(), 3 + 255);

        let mut spb = ServiceParameterBuffer::new();
        spb.append_bytes(ISC_SPB_USER_NAME, &[b'y'; 300]);
        assert_eq!(&spb.as_bytes()[3..5], &300u16.to_le_bytes());
        assert_eq!(spb.len(), 5 + 300);
    }

    #[test]
    fn test_duplicate_tags_accumulate() {
        let mut bpb = BlobParameterBuffer::new();
        bpb.append_i16(ISC_BPB_TARGET_TYPE, 1)
            .append_i16(ISC_BPB_TARGET_TYPE, 0);
        assert_eq!(
            bpb.as_bytes(),
            &[ISC_BPB_VERSION1, ISC_BPB_TARGET_TYPE, 2, 0, 1, ISC_BPB_TARGET_TYPE, 2, 0, 0]
        );
    }

    #[test]
    fn test_event_buffer_is_little_endian() {
        let epb = EventParameterBuffer::with_events([("NEW_ORDER", 0x0102)]);
        let mut expected = vec![EPB_VERSION1, 9];
        expected.extend_from_slice(b"NEW_ORDER");
        expected.extend_from_slice(&[0x02, 0x01, 0, 0]);
        assert_eq!(epb.as_bytes(), expected.as_slice());
    }

    #[test]
    fn test_service_buffer_two_byte_length() {
        let mut spb = ServiceParameterBuffer::new();
        spb.append_str(ISC_SPB_USER_NAME, "ab");
        assert_eq!(
            spb.as_bytes(),
            &[ISC_SPB_VERSION2, ISC_SPB_CURRENT_VERSION, ISC_SPB_USER_NAME, 2, 0, b'a', b'b']
        );
    }
}
