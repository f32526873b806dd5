//! Statement requests: prepare, info, execute, fetch and free.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{buffer_wire_size, Message, WriteExt, INT_WIRE_SIZE};

/// op_prepare_statement.
pub struct PrepareMessage<'a> {
    pub tx_handle: i32,
    pub stmt_handle: i32,
    pub dialect: i32,
    pub sql: &'a [u8],
    pub items: &'a [u8],
    pub buffer_size: u32,
}

impl Message for PrepareMessage<'_> {
    fn op(&self) -> u32 {
        OP_PREPARE_STATEMENT
    }

    fn wire_size(&self) -> usize {
        3 * INT_WIRE_SIZE
            + buffer_wire_size(self.sql.len())
            + buffer_wire_size(self.items.len())
            + INT_WIRE_SIZE
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(self.tx_handle);
        buf.write_i32(self.stmt_handle);
        buf.write_i32(self.dialect);
        buf.write_buffer(self.sql);
        buf.write_buffer(self.items);
        buf.write_u32(self.buffer_size);
        Ok(())
    }
}

/// op_info_sql.
pub struct InfoSqlMessage<'a> {
    pub stmt_handle: i32,
    pub items: &'a [u8],
    pub buffer_size: u32,
}

impl Message for InfoSqlMessage<'_> {
    fn op(&self) -> u32 {
        OP_INFO_SQL
    }

    fn wire_size(&self) -> usize {
        2 * INT_WIRE_SIZE + buffer_wire_size(self.items.len()) + INT_WIRE_SIZE
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(self.stmt_handle);
        buf.write_i32(0); // incarnation
        buf.write_buffer(self.items);
        buf.write_u32(self.buffer_size);
        Ok(())
    }
}

/// op_execute, or op_execute2 when an output format is present.
pub struct ExecuteMessage<'a> {
    pub stmt_handle: i32,
    pub tx_handle: i32,
    /// BLR of the parameter message; empty without parameters.
    pub input_blr: &'a [u8],
    /// Encoded parameter row.
    pub input_row: &'a [u8],
    /// BLR of the output message for stored procedures.
    pub output_blr: Option<&'a [u8]>,
}

impl ExecuteMessage<'_> {
    fn message_count(&self) -> i32 {
        i32::from(!self.input_blr.is_empty())
    }
}

impl Message for ExecuteMessage<'_> {
    fn op(&self) -> u32 {
        if self.output_blr.is_some() {
            OP_EXECUTE2
        } else {
            OP_EXECUTE
        }
    }

    fn wire_size(&self) -> usize {
        let mut size = 2 * INT_WIRE_SIZE + buffer_wire_size(self.input_blr.len());
        size += 2 * INT_WIRE_SIZE; // message number, message count
        size += self.input_row.len();
        if let Some(blr) = self.output_blr {
            size += buffer_wire_size(blr.len()) + INT_WIRE_SIZE;
        }
        size
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(self.stmt_handle);
        buf.write_i32(self.tx_handle);
        buf.write_buffer(self.input_blr);
        buf.write_i32(0);
        buf.write_i32(self.message_count());
        buf.extend_from_slice(self.input_row);
        if let Some(blr) = self.output_blr {
            buf.write_buffer(blr);
            buf.write_i32(0);
        }
        Ok(())
    }
}

/// op_fetch.
pub struct FetchMessage<'a> {
    pub stmt_handle: i32,
    pub blr: &'a [u8],
    pub fetch_size: i32,
}

impl Message for FetchMessage<'_> {
    fn op(&self) -> u32 {
        OP_FETCH
    }

    fn wire_size(&self) -> usize {
        INT_WIRE_SIZE + buffer_wire_size(self.blr.len()) + 2 * INT_WIRE_SIZE
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(self.stmt_handle);
        buf.write_buffer(self.blr);
        buf.write_i32(0); // message number
        buf.write_i32(self.fetch_size);
        Ok(())
    }
}

/// op_free_statement with DSQL_close or DSQL_drop.
pub struct FreeStatementMessage {
    pub stmt_handle: i32,
    pub option: i32,
}

impl Message for FreeStatementMessage {
    fn op(&self) -> u32 {
        OP_FREE_STATEMENT
    }

    fn wire_size(&self) -> usize {
        2 * INT_WIRE_SIZE
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(self.stmt_handle);
        buf.write_i32(self.option);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_switches_to_execute2() {
        let plain = ExecuteMessage {
            stmt_handle: 1,
            tx_handle: 2,
            input_blr: &[],
            input_row: &[],
            output_blr: None,
        };
        assert_eq!(plain.op(), OP_EXECUTE);
        let payload = plain.to_payload().unwrap();
        assert_eq!(payload.len(), plain.wire_size());
        // message count is zero without parameters
        assert_eq!(&payload[payload.len() - 4..], &[0, 0, 0, 0]);

        let proc = ExecuteMessage {
            output_blr: Some(&[5, 2, 4, 0]),
            ..plain
        };
        assert_eq!(proc.op(), OP_EXECUTE2);
        assert_eq!(proc.to_payload().unwrap().len(), proc.wire_size());
    }

    #[test]
    fn test_prepare_layout() {
        let msg = PrepareMessage {
            tx_handle: 5,
            stmt_handle: 6,
            dialect: 3,
            sql: b"SELECT 1 FROM RDB$DATABASE",
            items: &[ISC_INFO_SQL_STMT_TYPE],
            buffer_size: 32767,
        };
        let payload = msg.to_payload().unwrap();
        assert_eq!(payload.len(), msg.wire_size());
        assert_eq!(&payload[8..12], &[0, 0, 0, 3]);
        assert_eq!(&payload[payload.len() - 4..], &32767u32.to_be_bytes());
    }

    #[test]
    fn test_fetch_and_free_sizes() {
        let fetch = FetchMessage {
            stmt_handle: 1,
            blr: &[5, 2, 4, 0, 0, 0, 255, 76],
            fetch_size: 200,
        };
        assert_eq!(fetch.to_payload().unwrap().len(), fetch.wire_size());

        let free = FreeStatementMessage {
            stmt_handle: 1,
            option: DSQL_DROP,
        };
        assert_eq!(free.to_payload().unwrap(), vec![0, 0, 0, 1, 0, 0, 0, 2]);
    }
}
