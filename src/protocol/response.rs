//! Response parsing for server replies.
//!
//! Every reply starts with its op code. Errors arrive as an op_response
//! carrying a non-empty status vector, whatever operation was requested.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::buffer::ReadBuffer;
use crate::protocol::charset::CharsetContext;
use crate::protocol::codec::{read_field_value, read_row};
use crate::protocol::constants::*;
use crate::protocol::status::{parse_status_vector, IscError};
use crate::protocol::types::{
    blr_to_sql_type, ArrayDesc, ArrayValue, DbValue, Descriptor, Field, FieldValue,
};

/// Body of an op_response.
#[derive(Debug, Clone, Default)]
pub struct GenericResponse {
    /// Object handle (transaction, statement, blob, event id).
    pub handle: i32,
    /// Blob or array id for create operations.
    pub blob_id: i64,
    /// Info answer or segment data.
    pub data: Bytes,
    /// Warnings returned alongside a successful result.
    pub warning: Option<IscError>,
}

/// Read the op code of the next reply.
pub fn read_op(buf: &mut ReadBuffer) -> Result<u32> {
    let op = buf.read_u32()?;
    tracing::trace!(op, "received operation");
    Ok(op)
}

/// Parse a complete op_response.
pub fn parse_response(buf: &mut ReadBuffer) -> Result<GenericResponse> {
    match read_op(buf)? {
        OP_RESPONSE => parse_response_body(buf),
        actual => Err(Error::UnexpectedOperation {
            expected: OP_RESPONSE,
            actual,
        }),
    }
}

/// Parse an op_response after its op code.
///
/// A status vector with errors becomes `Error::Isc`; a warning-only vector
/// is logged and kept on the response.
pub fn parse_response_body(buf: &mut ReadBuffer) -> Result<GenericResponse> {
    let handle = buf.read_i32()?;
    let blob_id = buf.read_i64()?;
    let data = buf.read_buffer()?;

    let warning = match parse_status_vector(buf)? {
        None => None,
        Some(status) if status.is_warning() => {
            tracing::warn!(code = status.error_code(), message = %status, "server warning");
            Some(status)
        }
        Some(status) => return Err(Error::Isc(status)),
    };

    Ok(GenericResponse {
        handle,
        blob_id,
        data,
        warning,
    })
}

/// Rows received for one op_fetch.
#[derive(Debug, Default)]
pub struct FetchBatch {
    /// One descriptor per row, values filled in.
    pub rows: Vec<Descriptor>,
    /// The server reported end of cursor.
    pub exhausted: bool,
}

/// Parse the op_fetch_response sequence answering an op_fetch.
///
/// Each row arrives as its own op_fetch_response with count 1; a final
/// message with count 0 closes the batch, status 100 marking end of cursor.
pub fn parse_fetch_response(buf: &mut ReadBuffer, template: &Descriptor) -> Result<FetchBatch> {
    let mut batch = FetchBatch::default();
    loop {
        match read_op(buf)? {
            OP_FETCH_RESPONSE => {
                let status = buf.read_i32()?;
                let count = buf.read_i32()?;
                if count == 0 {
                    batch.exhausted = status == FETCH_NO_MORE_ROWS;
                    break;
                }
                let mut row = template.clone();
                row.clear_values();
                read_row(buf, &mut row)?;
                batch.rows.push(row);
            }
            OP_RESPONSE => {
                // Only an error status ends a fetch with op_response.
                parse_response_body(buf)?;
                return Err(Error::protocol("Fetch answered with op_response"));
            }
            actual => {
                return Err(Error::UnexpectedOperation {
                    expected: OP_FETCH_RESPONSE,
                    actual,
                })
            }
        }
    }
    Ok(batch)
}

/// Parse the op_sql_response carrying an op_execute2 output row.
///
/// Returns `None` when the procedure produced no row.
pub fn parse_sql_response(buf: &mut ReadBuffer, template: &Descriptor) -> Result<Option<Descriptor>> {
    match read_op(buf)? {
        OP_SQL_RESPONSE => {
            let count = buf.read_i32()?;
            if count == 0 {
                return Ok(None);
            }
            let mut row = template.clone();
            row.clear_values();
            read_row(buf, &mut row)?;
            Ok(Some(row))
        }
        OP_RESPONSE => {
            parse_response_body(buf)?;
            Err(Error::protocol("Execute answered without a result row"))
        }
        actual => Err(Error::UnexpectedOperation {
            expected: OP_SQL_RESPONSE,
            actual,
        }),
    }
}

/// Build the field used to decode array elements.
pub fn element_field(desc: &ArrayDesc, charsets: &CharsetContext) -> Result<Field> {
    let mut field = Field::new(charsets.default_charset().clone());
    field.set_sql_type(blr_to_sql_type(desc.blr_type as i32)?);
    field.set_scale(desc.scale as i32, charsets);
    field.set_length(desc.length as i32);
    field.set_name(&desc.field_name);
    field.set_relation(&desc.relation_name);
    Ok(field)
}

/// Parse an op_slice reply into an array value shaped by `desc`.
///
/// The reply is the slice byte length twice, then the elements in XDR.
pub fn parse_slice_response(
    buf: &mut ReadBuffer,
    desc: &ArrayDesc,
    charsets: &CharsetContext,
) -> Result<ArrayValue> {
    match read_op(buf)? {
        OP_SLICE => {}
        OP_RESPONSE => {
            parse_response_body(buf)?;
            return Err(Error::protocol("Slice request answered without data"));
        }
        actual => {
            return Err(Error::UnexpectedOperation {
                expected: OP_SLICE,
                actual,
            })
        }
    }

    let length = buf.read_i32()?;
    buf.read_i32()?;

    let field = element_field(desc, charsets)?;
    let count = if length <= 0 { 0 } else { desc.element_count() };
    let mut elements = Vec::with_capacity(count);
    for _ in 0..count {
        let value = match read_field_value(buf, &field)? {
            FieldValue::Resolved(value) => value,
            FieldValue::Unresolved(_) => {
                return Err(Error::protocol("Array elements cannot be handles"))
            }
        };
        elements.push(value);
    }

    let extents: Vec<usize> = desc.bounds.iter().map(|b| b.extent()).collect();
    let lower_bounds: Vec<i32> = desc.bounds.iter().map(|b| b.lower).collect();
    if elements.is_empty() {
        elements = vec![DbValue::Null; desc.element_count()];
    }
    ArrayValue::with_bounds(elements, extents, lower_bounds)
        .ok_or_else(|| Error::protocol("Slice element count does not match array shape"))
}
