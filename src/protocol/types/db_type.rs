//! Host data kinds derived from wire type tags.
//!
//! Note: Nullability is a field property, not a type property. The wire
//! tag passed here must already have its nullable bit cleared.

use std::fmt;

use crate::error::{Error, Result};
use crate::protocol::constants::*;

/// Host-side classification of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbDataType {
    /// CHAR(n) - fixed-length string.
    Char,
    /// VARCHAR(n) - variable-length string.
    VarChar,
    /// BLOB SUB_TYPE TEXT.
    Text,
    /// SMALLINT.
    SmallInt,
    /// INTEGER.
    Integer,
    /// BIGINT (also the legacy QUAD tag).
    BigInt,
    /// NUMERIC(p, s), declared via subtype 1.
    Numeric,
    /// DECIMAL(p, s), declared via subtype 2.
    Decimal,
    /// FLOAT.
    Float,
    /// DOUBLE PRECISION.
    Double,
    /// DATE.
    Date,
    /// TIME.
    Time,
    /// TIMESTAMP.
    TimeStamp,
    /// BLOB of any non-text subtype.
    Binary,
    /// Multi-dimensional array column.
    Array,
    /// CHAR(16) CHARACTER SET OCTETS holding a UUID.
    Guid,
}

impl DbDataType {
    /// Classify a wire type tag.
    ///
    /// Exact numerics become `Numeric` or `Decimal` only when the server
    /// declares it through the subtype; the scale is not consulted.
    ///
    /// Returns `Err(Error::UnsupportedType)` for unknown tags.
    pub fn from_wire(sql_type: i32, sub_type: i32, _scale: i32) -> Result<Self> {
        let exact = |base: DbDataType| match sub_type {
            1 => DbDataType::Numeric,
            2 => DbDataType::Decimal,
            _ => base,
        };

        match sql_type & !1 {
            SQL_TEXT => Ok(DbDataType::Char),
            SQL_VARYING => Ok(DbDataType::VarChar),
            SQL_SHORT => Ok(exact(DbDataType::SmallInt)),
            SQL_LONG => Ok(exact(DbDataType::Integer)),
            SQL_INT64 | SQL_QUAD => Ok(exact(DbDataType::BigInt)),
            SQL_DOUBLE | SQL_D_FLOAT => Ok(exact(DbDataType::Double)),
            SQL_FLOAT => Ok(DbDataType::Float),
            SQL_BLOB => Ok(if sub_type == 1 {
                DbDataType::Text
            } else {
                DbDataType::Binary
            }),
            SQL_ARRAY => Ok(DbDataType::Array),
            SQL_TYPE_DATE => Ok(DbDataType::Date),
            SQL_TYPE_TIME => Ok(DbDataType::Time),
            SQL_TIMESTAMP => Ok(DbDataType::TimeStamp),
            _ => Err(Error::UnsupportedType { type_num: sql_type }),
        }
    }

    /// Whether values of this kind arrive as a blob/array handle that must
    /// be materialized with a second round trip.
    pub fn is_handle_backed(&self) -> bool {
        matches!(self, DbDataType::Text | DbDataType::Binary | DbDataType::Array)
    }

    /// Whether this is a character kind (CHAR / VARCHAR).
    pub fn is_character(&self) -> bool {
        matches!(self, DbDataType::Char | DbDataType::VarChar)
    }

    /// Whether this is an exact scaled numeric.
    pub fn is_exact_numeric(&self) -> bool {
        matches!(self, DbDataType::Numeric | DbDataType::Decimal)
    }

    /// SQL name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            DbDataType::Char => "CHAR",
            DbDataType::VarChar => "VARCHAR",
            DbDataType::Text => "BLOB SUB_TYPE TEXT",
            DbDataType::SmallInt => "SMALLINT",
            DbDataType::Integer => "INTEGER",
            DbDataType::BigInt => "BIGINT",
            DbDataType::Numeric => "NUMERIC",
            DbDataType::Decimal => "DECIMAL",
            DbDataType::Float => "FLOAT",
            DbDataType::Double => "DOUBLE PRECISION",
            DbDataType::Date => "DATE",
            DbDataType::Time => "TIME",
            DbDataType::TimeStamp => "TIMESTAMP",
            DbDataType::Binary => "BLOB",
            DbDataType::Array => "ARRAY",
            DbDataType::Guid => "CHAR(16) CHARACTER SET OCTETS",
        }
    }
}

impl fmt::Display for DbDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a BLR element type (as stored in RDB$FIELDS) to its SQL type tag.
pub fn blr_to_sql_type(blr_type: i32) -> Result<i32> {
    let sql_type = match u8::try_from(blr_type).ok() {
        Some(BLR_SHORT) => SQL_SHORT,
        Some(BLR_LONG) => SQL_LONG,
        Some(BLR_QUAD) => SQL_QUAD,
        Some(BLR_INT64) => SQL_INT64,
        Some(BLR_FLOAT) => SQL_FLOAT,
        Some(BLR_DOUBLE) => SQL_DOUBLE,
        Some(BLR_D_FLOAT) => SQL_D_FLOAT,
        Some(BLR_TEXT) | Some(BLR_TEXT2) | Some(BLR_CSTRING) | Some(BLR_CSTRING2) => SQL_TEXT,
        Some(BLR_VARYING) | Some(BLR_VARYING2) => SQL_VARYING,
        Some(BLR_SQL_DATE) => SQL_TYPE_DATE,
        Some(BLR_SQL_TIME) => SQL_TYPE_TIME,
        Some(BLR_TIMESTAMP) => SQL_TIMESTAMP,
        _ => {
            return Err(Error::UnsupportedType {
                type_num: blr_type,
            })
        }
    };
    Ok(sql_type)
}
