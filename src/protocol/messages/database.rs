//! Attachment, transaction and event requests.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{buffer_wire_size, Message, WriteExt, INT_WIRE_SIZE};

/// A request whose payload is a single object handle.
///
/// Covers op_detach, op_commit, op_commit_retaining, op_rollback,
/// op_allocate_statement, op_close_blob and op_cancel_blob.
#[derive(Debug, Clone, Copy)]
pub struct HandleMessage {
    pub op: u32,
    pub handle: i32,
}

impl HandleMessage {
    pub fn new(op: u32, handle: i32) -> Self {
        Self { op, handle }
    }
}

impl Message for HandleMessage {
    fn op(&self) -> u32 {
        self.op
    }

    fn wire_size(&self) -> usize {
        INT_WIRE_SIZE
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(self.handle);
        Ok(())
    }
}

/// op_attach: database path and DPB.
pub struct AttachMessage<'a> {
    pub database: &'a [u8],
    pub dpb: &'a [u8],
}

impl Message for AttachMessage<'_> {
    fn op(&self) -> u32 {
        OP_ATTACH
    }

    fn wire_size(&self) -> usize {
        INT_WIRE_SIZE + buffer_wire_size(self.database.len()) + buffer_wire_size(self.dpb.len())
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(0); // database object id, unused
        buf.write_buffer(self.database);
        buf.write_buffer(self.dpb);
        Ok(())
    }
}

/// op_transaction: start a transaction with a TPB.
pub struct TransactionMessage<'a> {
    pub db_handle: i32,
    pub tpb: &'a [u8],
}

impl Message for TransactionMessage<'_> {
    fn op(&self) -> u32 {
        OP_TRANSACTION
    }

    fn wire_size(&self) -> usize {
        INT_WIRE_SIZE + buffer_wire_size(self.tpb.len())
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(self.db_handle);
        buf.write_buffer(self.tpb);
        Ok(())
    }
}

/// op_que_events: register interest in the events of an EPB.
pub struct QueueEventsMessage<'a> {
    pub db_handle: i32,
    pub epb: &'a [u8],
    pub local_id: i32,
}

impl Message for QueueEventsMessage<'_> {
    fn op(&self) -> u32 {
        OP_QUE_EVENTS
    }

    fn wire_size(&self) -> usize {
        INT_WIRE_SIZE + buffer_wire_size(self.epb.len()) + 3 * INT_WIRE_SIZE
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(self.db_handle);
        buf.write_buffer(self.epb);
        buf.write_i32(0); // ast routine
        buf.write_i32(0); // ast argument
        buf.write_i32(self.local_id);
        Ok(())
    }
}

/// op_cancel_events: drop a registration.
pub struct CancelEventsMessage {
    pub db_handle: i32,
    pub event_id: i32,
}

impl Message for CancelEventsMessage {
    fn op(&self) -> u32 {
        OP_CANCEL_EVENTS
    }

    fn wire_size(&self) -> usize {
        2 * INT_WIRE_SIZE
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(self.db_handle);
        buf.write_i32(self.event_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_layout() {
        let msg = AttachMessage {
            database: b"emp.fdb",
            dpb: &[1, 28, 1, 3],
        };
        let payload = msg.to_payload().unwrap();
        assert_eq!(payload.len(), msg.wire_size());
        assert_eq!(&payload[..8], &[0, 0, 0, 0, 0, 0, 0, 7]);
        assert_eq!(&payload[8..16], b"emp.fdb\0");
    }

    #[test]
    fn test_queue_events_wire_size() {
        let msg = QueueEventsMessage {
            db_handle: 1,
            epb: &[1, 3, b'a', b'b', b'c', 0, 0, 0, 0],
            local_id: 9,
        };
        assert_eq!(msg.to_payload().unwrap().len(), msg.wire_size());
    }
}
