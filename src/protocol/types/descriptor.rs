//! Ordered field set for one side (input or output) of a statement.

use std::sync::Arc;

use super::field::Field;
use crate::error::{Error, Result};
use crate::protocol::charset::Charset;
use crate::protocol::constants::*;

/// Describe protocol version tag carried by descriptors.
pub const DESCRIPTOR_VERSION: i16 = 1;

/// Column or parameter descriptor.
///
/// Fields are exclusively owned; cloning a descriptor clones its values.
#[derive(Debug, Clone)]
pub struct Descriptor {
    version: i16,
    actual_count: usize,
    fields: Vec<Field>,
}

impl Descriptor {
    /// Allocate `count` empty fields using the given charset.
    pub fn from_field_count(count: usize, charset: &Arc<Charset>) -> Self {
        Self {
            version: DESCRIPTOR_VERSION,
            actual_count: count,
            fields: (0..count).map(|_| Field::new(Arc::clone(charset))).collect(),
        }
    }

    /// Descriptor without fields.
    pub fn empty() -> Self {
        Self {
            version: DESCRIPTOR_VERSION,
            actual_count: 0,
            fields: Vec::new(),
        }
    }

    pub fn version(&self) -> i16 {
        self.version
    }

    /// Number of allocated fields.
    pub fn count(&self) -> usize {
        self.fields.len()
    }

    /// Number of fields the server reported.
    pub fn actual_count(&self) -> usize {
        self.actual_count
    }

    /// Record how many fields the server reported (clamped to `count`).
    pub fn set_actual_count(&mut self, actual: usize) {
        self.actual_count = actual.min(self.fields.len());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field by 0-based index.
    pub fn get(&self, index: usize) -> Result<&Field> {
        let count = self.fields.len();
        self.fields
            .get(index)
            .ok_or(Error::ColumnIndexOutOfBounds { index, count })
    }

    /// Mutable field by 0-based index.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut Field> {
        let count = self.fields.len();
        self.fields
            .get_mut(index)
            .ok_or(Error::ColumnIndexOutOfBounds { index, count })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Field> {
        self.fields.iter_mut()
    }

    /// Reset every value to NULL.
    pub fn clear_values(&mut self) {
        for field in &mut self.fields {
            field.take_value();
        }
    }

    /// Drop array shapes cached on fields.
    pub fn clear_array_handles(&mut self) {
        for field in &mut self.fields {
            field.clear_array_desc();
        }
    }

    /// Build the BLR message describing this descriptor's wire layout.
    ///
    /// Each field contributes its type (with length or scale) followed by a
    /// `blr_short 0` null indicator slot.
    pub fn to_blr(&self) -> Result<Vec<u8>> {
        let mut blr = Vec::with_capacity(8 + self.fields.len() * 6);
        let slots = (self.fields.len() * 2) as u16;

        blr.extend_from_slice(&[BLR_VERSION5, BLR_BEGIN, BLR_MESSAGE, 0]);
        blr.extend_from_slice(&slots.to_le_bytes());

        for field in &self.fields {
            let length = field.length() as u16;
            let scale = field.scale() as u8;
            match field.sql_type() {
                SQL_VARYING => {
                    blr.push(BLR_VARYING);
                    blr.extend_from_slice(&length.to_le_bytes());
                }
                SQL_TEXT => {
                    blr.push(BLR_TEXT);
                    blr.extend_from_slice(&length.to_le_bytes());
                }
                SQL_DOUBLE => blr.push(BLR_DOUBLE),
                SQL_FLOAT => blr.push(BLR_FLOAT),
                SQL_D_FLOAT => blr.push(BLR_D_FLOAT),
                SQL_TYPE_DATE => blr.push(BLR_SQL_DATE),
                SQL_TYPE_TIME => blr.push(BLR_SQL_TIME),
                SQL_TIMESTAMP => blr.push(BLR_TIMESTAMP),
                SQL_BLOB | SQL_ARRAY => blr.extend_from_slice(&[BLR_QUAD, 0]),
                SQL_LONG => blr.extend_from_slice(&[BLR_LONG, scale]),
                SQL_SHORT => blr.extend_from_slice(&[BLR_SHORT, scale]),
                SQL_INT64 => blr.extend_from_slice(&[BLR_INT64, scale]),
                SQL_QUAD => blr.extend_from_slice(&[BLR_QUAD, scale]),
                other => return Err(Error::UnsupportedType { type_num: other }),
            }
            blr.extend_from_slice(&[BLR_SHORT, 0]);
        }

        blr.extend_from_slice(&[BLR_END, BLR_EOC]);
        Ok(blr)
    }
}

impl<'a> IntoIterator for &'a Descriptor {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
