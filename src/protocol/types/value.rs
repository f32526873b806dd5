//! Firebird value types for rows and parameters.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::fmt;
use uuid::Uuid;

/// A single column or parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    /// NULL value.
    Null,
    /// String value (CHAR, VARCHAR, text BLOB).
    String(String),
    /// SMALLINT value.
    SmallInt(i16),
    /// INTEGER value.
    Integer(i32),
    /// BIGINT value.
    BigInt(i64),
    /// Exact scaled numeric (NUMERIC / DECIMAL).
    Decimal(Decimal),
    /// FLOAT value.
    Float(f32),
    /// DOUBLE PRECISION value.
    Double(f64),
    /// DATE value.
    Date(NaiveDate),
    /// TIME value.
    Time(NaiveTime),
    /// TIMESTAMP value.
    TimeStamp(NaiveDateTime),
    /// Binary value (binary BLOB, OCTETS text).
    Binary(Vec<u8>),
    /// UUID stored as CHAR(16) OCTETS.
    Guid(Uuid),
    /// Array column contents.
    Array(ArrayValue),
}

impl DbValue {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null)
    }

    /// Try to get the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DbValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to convert to i64.
    pub fn to_i64(&self) -> Option<i64> {
        use rust_decimal::prelude::ToPrimitive;
        match self {
            DbValue::SmallInt(v) => Some(*v as i64),
            DbValue::Integer(v) => Some(*v as i64),
            DbValue::BigInt(v) => Some(*v),
            DbValue::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            _ => None,
        }
    }

    /// Try to convert to f64.
    pub fn to_f64(&self) -> Option<f64> {
        use rust_decimal::prelude::ToPrimitive;
        match self {
            DbValue::SmallInt(v) => Some(*v as f64),
            DbValue::Integer(v) => Some(*v as f64),
            DbValue::BigInt(v) => Some(*v as f64),
            DbValue::Decimal(d) => d.to_f64(),
            DbValue::Float(v) => Some(*v as f64),
            DbValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get the value as a decimal.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            DbValue::Decimal(d) => Some(*d),
            DbValue::SmallInt(v) => Some(Decimal::from(*v)),
            DbValue::Integer(v) => Some(Decimal::from(*v)),
            DbValue::BigInt(v) => Some(Decimal::from(*v)),
            _ => None,
        }
    }

    /// Try to get the value as a date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            DbValue::Date(d) => Some(*d),
            DbValue::TimeStamp(ts) => Some(ts.date()),
            _ => None,
        }
    }

    /// Try to get the value as a timestamp.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            DbValue::TimeStamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Try to get the value as raw bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            DbValue::Binary(bytes) => Some(bytes),
            DbValue::Guid(uuid) => Some(uuid.as_bytes()),
            _ => None,
        }
    }

    /// Try to get the value as an array.
    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            DbValue::Array(array) => Some(array),
            _ => None,
        }
    }
}

impl fmt::Display for DbValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbValue::Null => write!(f, "NULL"),
            DbValue::String(s) => write!(f, "{}", s),
            DbValue::SmallInt(v) => write!(f, "{}", v),
            DbValue::Integer(v) => write!(f, "{}", v),
            DbValue::BigInt(v) => write!(f, "{}", v),
            DbValue::Decimal(d) => write!(f, "{}", d),
            DbValue::Float(v) => write!(f, "{}", v),
            DbValue::Double(v) => write!(f, "{}", v),
            DbValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            DbValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.4f")),
            DbValue::TimeStamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.4f")),
            DbValue::Binary(bytes) => write!(f, "<BINARY: {} bytes>", bytes.len()),
            DbValue::Guid(uuid) => write!(f, "{}", uuid),
            DbValue::Array(array) => write!(f, "<ARRAY: {:?}>", array.extents()),
        }
    }
}

impl From<&str> for DbValue {
    fn from(value: &str) -> Self {
        DbValue::String(value.to_string())
    }
}

impl From<String> for DbValue {
    fn from(value: String) -> Self {
        DbValue::String(value)
    }
}

impl From<i16> for DbValue {
    fn from(value: i16) -> Self {
        DbValue::SmallInt(value)
    }
}

impl From<i32> for DbValue {
    fn from(value: i32) -> Self {
        DbValue::Integer(value)
    }
}

impl From<i64> for DbValue {
    fn from(value: i64) -> Self {
        DbValue::BigInt(value)
    }
}

impl From<f64> for DbValue {
    fn from(value: f64) -> Self {
        DbValue::Double(value)
    }
}

impl From<Decimal> for DbValue {
    fn from(value: Decimal) -> Self {
        DbValue::Decimal(value)
    }
}

impl From<NaiveDate> for DbValue {
    fn from(value: NaiveDate) -> Self {
        DbValue::Date(value)
    }
}

impl From<NaiveDateTime> for DbValue {
    fn from(value: NaiveDateTime) -> Self {
        DbValue::TimeStamp(value)
    }
}

impl From<Vec<u8>> for DbValue {
    fn from(value: Vec<u8>) -> Self {
        DbValue::Binary(value)
    }
}

impl From<Uuid> for DbValue {
    fn from(value: Uuid) -> Self {
        DbValue::Guid(value)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(DbValue::Null, Into::into)
    }
}

/// Contents of an array column: a row-major element vector plus the shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    elements: Vec<DbValue>,
    extents: Vec<usize>,
    lower_bounds: Vec<i32>,
}

impl ArrayValue {
    /// Create an array from row-major elements and per-dimension extents.
    ///
    /// Lower bounds default to 1 and are replaced with the column's declared
    /// bounds when the array is written.
    ///
    /// Returns `None` when the element count does not match the shape.
    pub fn new(elements: Vec<DbValue>, extents: Vec<usize>) -> Option<Self> {
        let lower_bounds = vec![1; extents.len()];
        Self::with_bounds(elements, extents, lower_bounds)
    }

    /// Create a one-dimensional array.
    pub fn from_vec(elements: Vec<DbValue>) -> Self {
        let extents = vec![elements.len()];
        Self {
            elements,
            extents,
            lower_bounds: vec![1],
        }
    }

    /// Create an array with explicit lower bounds.
    pub fn with_bounds(
        elements: Vec<DbValue>,
        extents: Vec<usize>,
        lower_bounds: Vec<i32>,
    ) -> Option<Self> {
        let count: usize = extents.iter().product();
        if extents.is_empty() || count != elements.len() || lower_bounds.len() != extents.len() {
            return None;
        }
        Some(Self {
            elements,
            extents,
            lower_bounds,
        })
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.extents.len()
    }

    /// Element count per dimension.
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// Declared lower bound per dimension.
    pub fn lower_bounds(&self) -> &[i32] {
        &self.lower_bounds
    }

    /// Elements in row-major order.
    pub fn elements(&self) -> &[DbValue] {
        &self.elements
    }

    /// Consume into the row-major element vector.
    pub fn into_elements(self) -> Vec<DbValue> {
        self.elements
    }

    /// Element at the given subscripts, using the declared lower bounds.
    pub fn get(&self, subscripts: &[i32]) -> Option<&DbValue> {
        if subscripts.len() != self.extents.len() {
            return None;
        }
        let mut offset = 0usize;
        for ((&sub, &lower), &extent) in subscripts
            .iter()
            .zip(&self.lower_bounds)
            .zip(&self.extents)
        {
            let index = usize::try_from(sub.checked_sub(lower)?).ok()?;
            if index >= extent {
                return None;
            }
            offset = offset * extent + index;
        }
        self.elements.get(offset)
    }
}

/// Storage of a field's value: either a raw blob/array handle still to be
/// fetched, or a host value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Blob or array id as received on the wire.
    Unresolved(i64),
    /// Materialized value.
    Resolved(DbValue),
}

impl FieldValue {
    /// Check if the value is a resolved NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Resolved(DbValue::Null))
    }

    /// Resolved value, if any.
    pub fn resolved(&self) -> Option<&DbValue> {
        match self {
            FieldValue::Resolved(value) => Some(value),
            FieldValue::Unresolved(_) => None,
        }
    }

    /// Unresolved handle, if any.
    pub fn handle(&self) -> Option<i64> {
        match self {
            FieldValue::Unresolved(handle) => Some(*handle),
            FieldValue::Resolved(_) => None,
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Resolved(DbValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_value_null() {
        let val = DbValue::Null;
        assert!(val.is_null());
        assert_eq!(val.as_str(), None);
        assert_eq!(format!("{}", val), "NULL");
    }

    #[test]
    fn test_db_value_numbers() {
        let val = DbValue::Decimal(Decimal::new(12345, 2));
        assert_eq!(val.to_i64(), None);
        assert_eq!(val.to_f64(), Some(123.45));
        assert_eq!(format!("{}", val), "123.45");

        assert_eq!(DbValue::Decimal(Decimal::new(4200, 2)).to_i64(), Some(42));
        assert_eq!(DbValue::SmallInt(7).to_i64(), Some(7));
        assert_eq!(DbValue::from(Some(5i32)), DbValue::Integer(5));
        assert_eq!(DbValue::from(None::<i32>), DbValue::Null);
    }

    #[test]
    fn test_array_value_shape() {
        let elements = (1..=6).map(DbValue::Integer).collect();
        let array = ArrayValue::with_bounds(elements, vec![2, 3], vec![0, 1]).unwrap();
        assert_eq!(array.rank(), 2);
        assert_eq!(array.get(&[0, 1]), Some(&DbValue::Integer(1)));
        assert_eq!(array.get(&[1, 3]), Some(&DbValue::Integer(6)));
        assert_eq!(array.get(&[2, 1]), None);
        assert_eq!(array.get(&[0]), None);

        assert!(ArrayValue::new(vec![DbValue::Null], vec![2]).is_none());
        assert!(ArrayValue::new(Vec::new(), Vec::new()).is_none());
    }

    #[test]
    fn test_field_value_default_is_null() {
        let value = FieldValue::default();
        assert!(value.is_null());
        assert_eq!(value.handle(), None);
        assert_eq!(FieldValue::Unresolved(9).handle(), Some(9));
    }
}
