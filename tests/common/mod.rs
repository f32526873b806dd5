//! Scripted in-memory transport and reply builders for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::io;

use bytes::Bytes;

use firebird_thin_rs::protocol::constants::*;
use firebird_thin_rs::protocol::WriteExt;
use firebird_thin_rs::{Database, DatabaseParams, Error, Result, Transport};

/// Transport replaying canned replies and recording every request.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: VecDeque<Bytes>,
    sent: Vec<(u32, Bytes)>,
    packet_size: u32,
}

impl ScriptedTransport {
    pub fn new(packet_size: u32) -> Self {
        Self {
            packet_size,
            ..Self::default()
        }
    }

    pub fn push(&mut self, reply: Vec<u8>) -> &mut Self {
        self.replies.push_back(Bytes::from(reply));
        self
    }

    /// Op codes sent so far, in order.
    pub fn ops(&self) -> Vec<u32> {
        self.sent.iter().map(|(op, _)| *op).collect()
    }

    /// Payload of the `index`th request.
    pub fn payload(&self, index: usize) -> &[u8] {
        &self.sent[index].1
    }

    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }

    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, op: u32, payload: Bytes) -> impl Future<Output = Result<Bytes>> + Send {
        self.sent.push((op, payload));
        let reply = self.replies.pop_front().ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("no scripted reply for op {}", op),
            ))
        });
        std::future::ready(reply)
    }

    fn packet_size(&self) -> u32 {
        self.packet_size
    }
}

/// Attach over a transport whose first reply accepts op_attach.
pub async fn attach(packet_size: u32) -> Database<ScriptedTransport> {
    let mut transport = ScriptedTransport::new(packet_size);
    transport.push(ok_handle(1));
    let params = DatabaseParams::new("employee", "SYSDBA", "masterkey");
    let mut db = Database::attach(transport, params).await.unwrap();
    db.transport_mut().clear_sent();
    db
}

fn success_status(out: &mut Vec<u8>) {
    out.write_i32(ISC_ARG_GDS);
    out.write_i32(0);
    out.write_i32(ISC_ARG_END);
}

/// op_response with handle, blob id and data buffer.
pub fn response(handle: i32, blob_id: i64, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u32(OP_RESPONSE);
    out.write_i32(handle);
    out.write_i64(blob_id);
    out.write_buffer(data);
    success_status(&mut out);
    out
}

pub fn ok() -> Vec<u8> {
    response(0, 0, &[])
}

pub fn ok_handle(handle: i32) -> Vec<u8> {
    response(handle, 0, &[])
}

pub fn ok_data(data: &[u8]) -> Vec<u8> {
    response(0, 0, data)
}

/// op_response failing with one gds code and a string argument.
pub fn error_response(code: i32, arg: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u32(OP_RESPONSE);
    out.write_i32(0);
    out.write_i64(0);
    out.write_buffer(&[]);
    out.write_i32(ISC_ARG_GDS);
    out.write_i32(code);
    out.write_i32(ISC_ARG_STRING);
    out.write_str(arg);
    out.write_i32(ISC_ARG_END);
    out
}

/// op_get_segment answer: `status` in the handle slot, segments in data.
pub fn segments(status: i32, parts: &[&[u8]]) -> Vec<u8> {
    let mut data = Vec::new();
    for part in parts {
        data.extend_from_slice(&(part.len() as u16).to_le_bytes());
        data.extend_from_slice(part);
    }
    response(status, 0, &data)
}

/// A fetch answer of single-integer rows followed by the closing message.
pub fn fetch_ints(values: &[i32], exhausted: bool) -> Vec<u8> {
    let rows: Vec<[i32; 1]> = values.iter().map(|&v| [v]).collect();
    let rows: Vec<&[i32]> = rows.iter().map(|r| &r[..]).collect();
    fetch_rows(&rows, exhausted)
}

pub fn int_item(out: &mut Vec<u8>, item: u8, value: i32) {
    out.push(item);
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn str_item(out: &mut Vec<u8>, item: u8, value: &str) {
    out.push(item);
    out.extend_from_slice(&(value.len() as u16).to_le_bytes());
    out.extend_from_slice(value.as_bytes());
}

pub fn describe_var(out: &mut Vec<u8>, seq: i32, sql_type: i32, length: i32, name: &str) {
    int_item(out, ISC_INFO_SQL_SQLDA_SEQ, seq);
    int_item(out, ISC_INFO_SQL_TYPE, sql_type);
    int_item(out, ISC_INFO_SQL_SUB_TYPE, 0);
    int_item(out, ISC_INFO_SQL_SCALE, 0);
    int_item(out, ISC_INFO_SQL_LENGTH, length);
    str_item(out, ISC_INFO_SQL_FIELD, name);
    str_item(out, ISC_INFO_SQL_RELATION, "T");
    str_item(out, ISC_INFO_SQL_OWNER, "SYSDBA");
    str_item(out, ISC_INFO_SQL_ALIAS, name);
    out.push(ISC_INFO_SQL_DESCRIBE_END);
}

/// Describe answer with `columns` output fields and `params` input fields,
/// all nullable integers.
pub fn describe(statement_type: i32, columns: &[&str], params: usize) -> Vec<u8> {
    let columns: Vec<(&str, i32, i32)> = columns.iter().map(|name| (*name, SQL_LONG + 1, 4)).collect();
    let params = vec![("P", SQL_LONG + 1, 4); params];
    describe_fields(statement_type, &columns, &params)
}

/// Describe answer with explicit `(name, sql_type, length)` fields.
pub fn describe_fields(
    statement_type: i32,
    columns: &[(&str, i32, i32)],
    params: &[(&str, i32, i32)],
) -> Vec<u8> {
    let mut data = Vec::new();
    int_item(&mut data, ISC_INFO_SQL_STMT_TYPE, statement_type);
    for (side, fields) in [(ISC_INFO_SQL_SELECT, columns), (ISC_INFO_SQL_BIND, params)] {
        data.push(side);
        int_item(&mut data, ISC_INFO_SQL_DESCRIBE_VARS, fields.len() as i32);
        for (i, &(name, sql_type, length)) in fields.iter().enumerate() {
            describe_var(&mut data, i as i32 + 1, sql_type, length, name);
        }
    }
    data.push(ISC_INFO_END);
    data
}

/// A fetch answer of integer rows followed by the closing message.
pub fn fetch_rows(rows: &[&[i32]], exhausted: bool) -> Vec<u8> {
    let mut out = Vec::new();
    for row in rows {
        out.write_u32(OP_FETCH_RESPONSE);
        out.write_i32(0);
        out.write_i32(1);
        for &value in row.iter() {
            out.write_i32(value);
            out.write_i32(0);
        }
    }
    out.write_u32(OP_FETCH_RESPONSE);
    out.write_i32(if exhausted { FETCH_NO_MORE_ROWS } else { 0 });
    out.write_i32(0);
    out
}

/// Plan answer carrying `text`.
pub fn plan(text: &str) -> Vec<u8> {
    let mut data = vec![ISC_INFO_SQL_GET_PLAN];
    let text = format!("\n{}", text);
    data.extend_from_slice(&(text.len() as u16).to_le_bytes());
    data.extend_from_slice(text.as_bytes());
    data.push(ISC_INFO_END);
    data
}

/// Record count answer.
pub fn records(select: i32, insert: i32, update: i32, delete: i32) -> Vec<u8> {
    let mut nested = Vec::new();
    int_item(&mut nested, ISC_INFO_REQ_SELECT_COUNT, select);
    int_item(&mut nested, ISC_INFO_REQ_INSERT_COUNT, insert);
    int_item(&mut nested, ISC_INFO_REQ_UPDATE_COUNT, update);
    int_item(&mut nested, ISC_INFO_REQ_DELETE_COUNT, delete);
    nested.push(ISC_INFO_END);

    let mut data = vec![ISC_INFO_SQL_RECORDS];
    data.extend_from_slice(&(nested.len() as u16).to_le_bytes());
    data.extend_from_slice(&nested);
    data.push(ISC_INFO_END);
    data
}
