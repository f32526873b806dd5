//! Blob requests.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{
    buffer_wire_size, Message, WriteExt, INT_WIRE_SIZE, LONG_WIRE_SIZE,
};

/// op_open_blob2 or op_create_blob2.
pub struct OpenBlobMessage<'a> {
    pub create: bool,
    pub bpb: &'a [u8],
    pub tx_handle: i32,
    /// Blob id to open; 0 when creating.
    pub blob_id: i64,
}

impl Message for OpenBlobMessage<'_> {
    fn op(&self) -> u32 {
        if self.create {
            OP_CREATE_BLOB2
        } else {
            OP_OPEN_BLOB2
        }
    }

    fn wire_size(&self) -> usize {
        buffer_wire_size(self.bpb.len()) + INT_WIRE_SIZE + LONG_WIRE_SIZE
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_buffer(self.bpb);
        buf.write_i32(self.tx_handle);
        buf.write_i64(self.blob_id);
        Ok(())
    }
}

/// op_get_segment: ask for up to `max_length` bytes of segments.
pub struct GetSegmentMessage {
    pub blob_handle: i32,
    pub max_length: u32,
}

impl Message for GetSegmentMessage {
    fn op(&self) -> u32 {
        OP_GET_SEGMENT
    }

    fn wire_size(&self) -> usize {
        2 * INT_WIRE_SIZE + buffer_wire_size(0)
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(self.blob_handle);
        buf.write_u32(self.max_length);
        buf.write_buffer(&[]);
        Ok(())
    }
}

/// op_put_segment: append one segment.
pub struct PutSegmentMessage<'a> {
    pub blob_handle: i32,
    pub segment: &'a [u8],
}

impl Message for PutSegmentMessage<'_> {
    fn op(&self) -> u32 {
        OP_PUT_SEGMENT
    }

    fn wire_size(&self) -> usize {
        2 * INT_WIRE_SIZE + buffer_wire_size(self.segment.len())
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(self.blob_handle);
        buf.write_i32(self.segment.len() as i32);
        buf.write_buffer(self.segment);
        Ok(())
    }
}
