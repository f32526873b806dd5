//! XDR encoding of field values and rows.
//!
//! A row on the wire is the sequence of its field values, each followed by
//! a 4-byte null indicator (0 for a value, -1 for NULL). Array slices use the
//! same element encoding without indicators.

use std::str::FromStr;

use rust_decimal::Decimal;
use uuid::Uuid;

use super::date::{decode_date, decode_time, decode_timestamp, encode_date, encode_time, encode_timestamp};
use super::number::{decode_scaled_integer, encode_scaled_decimal};
use crate::error::{Error, Result};
use crate::protocol::buffer::ReadBuffer;
use crate::protocol::constants::*;
use crate::protocol::message::{opaque_wire_size, WriteExt};
use crate::protocol::types::{DbDataType, DbValue, Descriptor, Field, FieldValue};

/// Null indicator written after a present value.
const NOT_NULL: i32 = 0;
/// Null indicator written after a NULL placeholder.
const IS_NULL: i32 = -1;

/// Read one field value (without its null indicator).
pub fn read_field_value(buf: &mut ReadBuffer, field: &Field) -> Result<FieldValue> {
    let value = match field.sql_type() {
        SQL_TEXT => {
            let bytes = buf.read_opaque(field.length().max(0) as usize)?;
            decode_text(field, &bytes, true)?
        }
        SQL_VARYING => {
            let bytes = buf.read_buffer()?;
            decode_text(field, &bytes, false)?
        }
        SQL_SHORT => {
            let raw = buf.read_i32()?;
            decode_integer(field, raw as i64, |v| DbValue::SmallInt(v as i16))?
        }
        SQL_LONG => {
            let raw = buf.read_i32()?;
            decode_integer(field, raw as i64, |v| DbValue::Integer(v as i32))?
        }
        SQL_INT64 | SQL_QUAD => {
            let raw = buf.read_i64()?;
            decode_integer(field, raw, DbValue::BigInt)?
        }
        SQL_FLOAT => DbValue::Float(buf.read_f32()?),
        SQL_DOUBLE | SQL_D_FLOAT => {
            let raw = buf.read_f64()?;
            if field.db_data_type()?.is_exact_numeric() {
                DbValue::Decimal(Decimal::try_from(raw).map_err(|_| {
                    Error::type_conversion(format!("Double {} is not a valid decimal", raw))
                })?)
            } else {
                DbValue::Double(raw)
            }
        }
        SQL_TYPE_DATE => DbValue::Date(decode_date(buf.read_i32()?)?),
        SQL_TYPE_TIME => DbValue::Time(decode_time(buf.read_i32()?)?),
        SQL_TIMESTAMP => {
            let date = buf.read_i32()?;
            let time = buf.read_i32()?;
            DbValue::TimeStamp(decode_timestamp(date, time)?)
        }
        SQL_BLOB | SQL_ARRAY => return Ok(FieldValue::Unresolved(buf.read_i64()?)),
        other => return Err(Error::UnsupportedType { type_num: other }),
    };
    Ok(FieldValue::Resolved(value))
}

fn decode_text(field: &Field, bytes: &[u8], fixed: bool) -> Result<DbValue> {
    let charset = field.charset();
    if charset.is_octets() {
        if field.db_data_type()? == DbDataType::Guid {
            let uuid = Uuid::from_slice(bytes)
                .map_err(|e| Error::type_conversion(format!("Invalid GUID bytes: {}", e)))?;
            return Ok(DbValue::Guid(uuid));
        }
        return Ok(DbValue::Binary(bytes.to_vec()));
    }

    let mut text = charset.decode(bytes)?;
    if fixed {
        // Multi-byte CHAR(n) is padded to n * bytes_per_character bytes.
        let bpc = charset.bytes_per_character().max(1) as i32;
        let char_count = field.char_count().max(0) as usize;
        if field.length() % bpc == 0 && text.chars().count() > char_count {
            text = text.chars().take(char_count).collect();
        }
    }
    Ok(DbValue::String(text))
}

fn decode_integer(field: &Field, raw: i64, plain: fn(i64) -> DbValue) -> Result<DbValue> {
    if field.scale() < 0 || field.db_data_type()?.is_exact_numeric() {
        return Ok(DbValue::Decimal(decode_scaled_integer(raw, field.scale())?));
    }
    Ok(plain(raw))
}

/// Read a whole row into the descriptor's field values.
pub fn read_row(buf: &mut ReadBuffer, descriptor: &mut Descriptor) -> Result<()> {
    for field in descriptor.iter_mut() {
        let value = read_field_value(buf, field)?;
        let indicator = buf.read_i32()?;
        if indicator == NOT_NULL {
            field.set_value(value);
        } else {
            field.set_value(FieldValue::Resolved(DbValue::Null));
        }
    }
    Ok(())
}

/// Write one field value (without its null indicator).
///
/// NULL is written as a zeroed placeholder of the type's wire size.
pub fn write_field_value(buf: &mut Vec<u8>, field: &Field, value: &FieldValue) -> Result<()> {
    let value = match value {
        FieldValue::Unresolved(handle) => {
            return match field.sql_type() {
                SQL_BLOB | SQL_ARRAY | SQL_QUAD => {
                    buf.write_i64(*handle);
                    Ok(())
                }
                other => Err(Error::type_conversion(format!(
                    "Handle value given for non-handle SQL type {}",
                    other
                ))),
            };
        }
        FieldValue::Resolved(value) => value,
    };

    if value.is_null() {
        write_null_placeholder(buf, field);
        return Ok(());
    }

    let length = field.length().max(0) as usize;
    match field.sql_type() {
        SQL_TEXT => {
            let mut bytes = encode_text(field, value)?;
            if bytes.len() > length {
                return Err(truncation(field, bytes.len()));
            }
            let pad = if field.charset().is_octets() { 0 } else { b' ' };
            bytes.resize(length, pad);
            buf.write_opaque(&bytes);
        }
        SQL_VARYING => {
            let bytes = encode_text(field, value)?;
            if bytes.len() > length {
                return Err(truncation(field, bytes.len()));
            }
            buf.write_buffer(&bytes);
        }
        SQL_SHORT | SQL_LONG => buf.write_i32(encode_integer(field, value)? as i32),
        SQL_INT64 | SQL_QUAD => buf.write_i64(encode_integer(field, value)?),
        SQL_FLOAT => buf.write_f32(encode_double(value)? as f32),
        SQL_DOUBLE | SQL_D_FLOAT => buf.write_f64(encode_double(value)?),
        SQL_TYPE_DATE => {
            let date = value
                .as_date()
                .ok_or_else(|| mismatch(value, "DATE"))?;
            buf.write_i32(encode_date(date));
        }
        SQL_TYPE_TIME => {
            let time = match value {
                DbValue::Time(t) => *t,
                DbValue::TimeStamp(ts) => ts.time(),
                other => return Err(mismatch(other, "TIME")),
            };
            buf.write_i32(encode_time(time));
        }
        SQL_TIMESTAMP => {
            let ts = match value {
                DbValue::TimeStamp(ts) => *ts,
                DbValue::Date(d) => d.and_time(chrono::NaiveTime::MIN),
                other => return Err(mismatch(other, "TIMESTAMP")),
            };
            let (date, time) = encode_timestamp(ts);
            buf.write_i32(date);
            buf.write_i32(time);
        }
        SQL_BLOB | SQL_ARRAY => match value {
            DbValue::BigInt(handle) => buf.write_i64(*handle),
            other => {
                return Err(Error::type_conversion(format!(
                    "Value {} must be stored as a blob or array before it is sent",
                    other
                )))
            }
        },
        other => return Err(Error::UnsupportedType { type_num: other }),
    }
    Ok(())
}

fn write_null_placeholder(buf: &mut Vec<u8>, field: &Field) {
    match field.sql_type() {
        SQL_TEXT => buf.write_zeros(opaque_wire_size(field.length().max(0) as usize)),
        SQL_VARYING => buf.write_i32(0),
        SQL_SHORT | SQL_LONG | SQL_FLOAT | SQL_TYPE_DATE | SQL_TYPE_TIME => buf.write_i32(0),
        _ => buf.write_i64(0),
    }
}

fn encode_text(field: &Field, value: &DbValue) -> Result<Vec<u8>> {
    match value {
        DbValue::String(s) => field.charset().encode(s),
        DbValue::Binary(bytes) => Ok(bytes.clone()),
        DbValue::Guid(uuid) => Ok(uuid.as_bytes().to_vec()),
        DbValue::Array(_) => Err(mismatch(value, "text")),
        other => field.charset().encode(&other.to_string()),
    }
}

fn encode_integer(field: &Field, value: &DbValue) -> Result<i64> {
    let decimal = match value {
        DbValue::SmallInt(v) => Decimal::from(*v),
        DbValue::Integer(v) => Decimal::from(*v),
        DbValue::BigInt(v) => Decimal::from(*v),
        DbValue::Decimal(d) => *d,
        DbValue::Float(v) => Decimal::try_from(*v as f64).map_err(|_| mismatch(value, "integer"))?,
        DbValue::Double(v) => Decimal::try_from(*v).map_err(|_| mismatch(value, "integer"))?,
        DbValue::String(s) => Decimal::from_str(s.trim()).map_err(|_| mismatch(value, "integer"))?,
        other => return Err(mismatch(other, "integer")),
    };
    encode_scaled_decimal(decimal, field.scale(), field.sql_type())
}

fn encode_double(value: &DbValue) -> Result<f64> {
    match value {
        DbValue::String(s) => s.trim().parse().map_err(|_| mismatch(value, "double")),
        other => other.to_f64().ok_or_else(|| mismatch(other, "double")),
    }
}

fn mismatch(value: &DbValue, target: &str) -> Error {
    Error::type_conversion(format!("Cannot convert {:?} to {}", value, target))
}

fn truncation(field: &Field, actual: usize) -> Error {
    Error::type_conversion(format!(
        "String of {} bytes exceeds column {} length {}",
        actual,
        field.column_name(),
        field.length()
    ))
}

/// Write every field value of a descriptor followed by its null indicator.
pub fn write_row(buf: &mut Vec<u8>, descriptor: &Descriptor) -> Result<()> {
    for field in descriptor {
        write_field_value(buf, field, field.value())?;
        buf.write_i32(if field.is_null() { IS_NULL } else { NOT_NULL });
    }
    Ok(())
}
