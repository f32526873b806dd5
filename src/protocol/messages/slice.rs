//! Array slice requests.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{
    buffer_wire_size, Message, WriteExt, INT_WIRE_SIZE, LONG_WIRE_SIZE,
};

/// op_get_slice: read a whole array.
pub struct GetSliceMessage<'a> {
    pub tx_handle: i32,
    pub array_id: i64,
    pub slice_length: i32,
    pub sdl: &'a [u8],
}

impl Message for GetSliceMessage<'_> {
    fn op(&self) -> u32 {
        OP_GET_SLICE
    }

    fn wire_size(&self) -> usize {
        INT_WIRE_SIZE
            + LONG_WIRE_SIZE
            + INT_WIRE_SIZE
            + buffer_wire_size(self.sdl.len())
            + buffer_wire_size(0)
            + INT_WIRE_SIZE
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(self.tx_handle);
        buf.write_i64(self.array_id);
        buf.write_i32(self.slice_length);
        buf.write_buffer(self.sdl);
        buf.write_buffer(&[]); // slice parameters
        buf.write_i32(0); // no slice data on read
        Ok(())
    }
}

/// op_put_slice: store a whole array, yielding a new array id.
pub struct PutSliceMessage<'a> {
    pub tx_handle: i32,
    pub slice_length: i32,
    pub sdl: &'a [u8],
    /// Elements already encoded in XDR.
    pub elements: &'a [u8],
}

impl Message for PutSliceMessage<'_> {
    fn op(&self) -> u32 {
        OP_PUT_SLICE
    }

    fn wire_size(&self) -> usize {
        INT_WIRE_SIZE
            + LONG_WIRE_SIZE
            + INT_WIRE_SIZE
            + buffer_wire_size(self.sdl.len())
            + buffer_wire_size(0)
            + INT_WIRE_SIZE
            + self.elements.len()
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(self.tx_handle);
        buf.write_i64(0);
        buf.write_i32(self.slice_length);
        buf.write_buffer(self.sdl);
        buf.write_buffer(&[]);
        buf.write_i32(self.slice_length);
        buf.extend_from_slice(self.elements);
        Ok(())
    }
}
