//! Array column I/O.
//!
//! The shape of an array column lives in the system catalog. Slices are
//! always transferred whole: the SDL covers every declared element.

use crate::database::Database;
use crate::error::{Error, Result};
use crate::protocol::codec::write_field_value;
use crate::protocol::constants::*;
use crate::protocol::messages::{GetSliceMessage, PutSliceMessage};
use crate::protocol::response::{element_field, parse_response, parse_slice_response};
use crate::protocol::transport::Transport;
use crate::protocol::types::{ArrayBound, ArrayDesc, ArrayValue, DbValue, FieldValue};
use crate::statement::Statement;
use crate::transaction::TransactionBinding;

const ARRAY_FIELD_QUERY: &str = "SELECT F.RDB$FIELD_TYPE, F.RDB$FIELD_SCALE, \
     F.RDB$FIELD_LENGTH, F.RDB$DIMENSIONS \
     FROM RDB$FIELDS F \
     JOIN RDB$RELATION_FIELDS R ON R.RDB$FIELD_SOURCE = F.RDB$FIELD_NAME \
     WHERE R.RDB$RELATION_NAME = ? AND R.RDB$FIELD_NAME = ?";

const ARRAY_BOUNDS_QUERY: &str = "SELECT D.RDB$LOWER_BOUND, D.RDB$UPPER_BOUND \
     FROM RDB$FIELD_DIMENSIONS D \
     JOIN RDB$RELATION_FIELDS R ON R.RDB$FIELD_SOURCE = D.RDB$FIELD_NAME \
     WHERE R.RDB$RELATION_NAME = ? AND R.RDB$FIELD_NAME = ? \
     ORDER BY D.RDB$DIMENSION";

/// An array column with its catalog shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayColumn {
    desc: ArrayDesc,
}

impl ArrayColumn {
    /// Wrap a known shape.
    pub fn new(desc: ArrayDesc) -> Result<Self> {
        desc.validate()?;
        Ok(Self { desc })
    }

    /// Look up and wrap the shape of `table.column`.
    pub async fn lookup<T: Transport>(
        db: &mut Database<T>,
        transaction: &TransactionBinding,
        table: &str,
        column: &str,
    ) -> Result<Self> {
        Self::new(Self::lookup_descriptor(db, transaction, table, column).await?)
    }

    /// Query the catalog for the shape of `table.column`.
    pub async fn lookup_descriptor<T: Transport>(
        db: &mut Database<T>,
        transaction: &TransactionBinding,
        table: &str,
        column: &str,
    ) -> Result<ArrayDesc> {
        let not_found = || Error::ArrayMetadataNotFound {
            table: table.to_string(),
            column: column.to_string(),
        };

        let field_rows = catalog_query(db, transaction, ARRAY_FIELD_QUERY, table, column).await?;
        let row = field_rows.first().ok_or_else(not_found)?;
        let number = |index: usize| -> Result<i64> {
            row.get(index)
                .and_then(DbValue::to_i64)
                .ok_or_else(|| Error::protocol(format!("Missing array attribute {}", index)))
        };
        let blr_type = number(0)?;
        let scale = number(1)?;
        let length = number(2)?;
        let dimensions = number(3)?.max(0) as usize;

        let bound_rows =
            catalog_query(db, transaction, ARRAY_BOUNDS_QUERY, table, column).await?;
        if bound_rows.is_empty() {
            return Err(not_found());
        }
        if bound_rows.len() != dimensions || dimensions > ARRAY_MAX_DIMENSIONS {
            return Err(Error::InvalidDimensions {
                expected: dimensions,
                actual: bound_rows.len(),
            });
        }
        let bounds = bound_rows
            .iter()
            .map(|row| {
                let lower = row.first().and_then(DbValue::to_i64);
                let upper = row.get(1).and_then(DbValue::to_i64);
                match (lower, upper) {
                    (Some(lower), Some(upper)) => Ok(ArrayBound::new(lower as i32, upper as i32)),
                    _ => Err(Error::protocol("Array bound is NULL")),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let desc = ArrayDesc {
            blr_type: u8::try_from(blr_type)
                .map_err(|_| Error::UnsupportedType { type_num: blr_type as i32 })?,
            scale: scale as i16,
            length: length as u16,
            bounds,
            flags: 0,
            relation_name: table.to_string(),
            field_name: column.to_string(),
        };
        desc.validate()?;
        tracing::debug!(
            table,
            column,
            dimensions = desc.dimensions(),
            blr_type = desc.blr_type,
            "array shape loaded"
        );
        Ok(desc)
    }

    /// Column shape.
    pub fn desc(&self) -> &ArrayDesc {
        &self.desc
    }

    /// Byte length of a full slice.
    pub fn slice_byte_length(&self) -> usize {
        self.desc.slice_byte_length()
    }

    /// Read the array stored under `array_id`.
    pub async fn read<T: Transport>(
        &self,
        db: &mut Database<T>,
        tx_handle: i32,
        array_id: i64,
    ) -> Result<ArrayValue> {
        read_array(db, tx_handle, &self.desc, array_id).await
    }

    /// Store `value` as a new array and return its id.
    pub async fn write<T: Transport>(
        &self,
        db: &mut Database<T>,
        tx_handle: i32,
        value: &ArrayValue,
    ) -> Result<i64> {
        write_array(db, tx_handle, &self.desc, value).await
    }
}

/// Run a two-parameter catalog query and collect its rows as plain values.
async fn catalog_query<T: Transport>(
    db: &mut Database<T>,
    transaction: &TransactionBinding,
    sql: &str,
    table: &str,
    column: &str,
) -> Result<Vec<Vec<DbValue>>> {
    let mut statement = Statement::new(db.params().fetch_size);
    let rows = run_catalog_query(db, &mut statement, transaction, sql, table, column).await;
    let released = statement.release(db).await;
    let rows = rows?;
    released?;
    Ok(rows)
}

async fn run_catalog_query<T: Transport>(
    db: &mut Database<T>,
    statement: &mut Statement,
    transaction: &TransactionBinding,
    sql: &str,
    table: &str,
    column: &str,
) -> Result<Vec<Vec<DbValue>>> {
    statement.prepare_bound(db, transaction.clone(), sql).await?;
    statement.set_parameter(0, table)?;
    statement.set_parameter(1, column)?;
    statement.execute_prepared(db).await?;

    let mut rows = Vec::new();
    while let Some(row) = statement.fetch_raw(db).await? {
        rows.push(
            row.iter()
                .map(|field| field.value().resolved().cloned().unwrap_or(DbValue::Null))
                .collect(),
        );
    }
    Ok(rows)
}

/// Read a whole array with op_get_slice.
pub async fn read_array<T: Transport>(
    db: &mut Database<T>,
    tx_handle: i32,
    desc: &ArrayDesc,
    array_id: i64,
) -> Result<ArrayValue> {
    let sdl = desc.to_sdl()?;
    let mut buf = db
        .request(&GetSliceMessage {
            tx_handle,
            array_id,
            slice_length: desc.slice_byte_length() as i32,
            sdl: &sdl,
        })
        .await?;
    let value = parse_slice_response(&mut buf, desc, db.charsets())?;
    tracing::debug!(array_id, elements = value.elements().len(), "array read");
    if desc.is_column_major() {
        reorder(value, desc, Order::FromColumnMajor)
    } else {
        Ok(value)
    }
}

/// Write a whole array with op_put_slice, returning the new array id.
///
/// Each dimension keeps its declared lower bound; the upper bound follows
/// the value's extent.
pub async fn write_array<T: Transport>(
    db: &mut Database<T>,
    tx_handle: i32,
    desc: &ArrayDesc,
    value: &ArrayValue,
) -> Result<i64> {
    if value.rank() != desc.dimensions() {
        return Err(Error::InvalidDimensions {
            expected: desc.dimensions(),
            actual: value.rank(),
        });
    }

    let mut shaped = desc.clone();
    for (bound, &extent) in shaped.bounds.iter_mut().zip(value.extents()) {
        bound.upper = bound.lower + extent as i32 - 1;
    }
    shaped.validate()?;

    let ordered;
    let value = if shaped.is_column_major() {
        ordered = reorder(value.clone(), &shaped, Order::ToColumnMajor)?;
        &ordered
    } else {
        value
    };

    let field = element_field(&shaped, db.charsets())?;
    let mut elements = Vec::with_capacity(shaped.slice_byte_length());
    for element in value.elements() {
        write_field_value(&mut elements, &field, &FieldValue::Resolved(element.clone()))?;
    }

    let sdl = shaped.to_sdl()?;
    let mut buf = db
        .request(&PutSliceMessage {
            tx_handle,
            slice_length: shaped.slice_byte_length() as i32,
            sdl: &sdl,
            elements: &elements,
        })
        .await?;
    let response = parse_response(&mut buf)?;
    tracing::debug!(array_id = response.blob_id, elements = value.elements().len(), "array written");
    Ok(response.blob_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    FromColumnMajor,
    ToColumnMajor,
}

/// Convert between row-major and column-major element order.
fn reorder(value: ArrayValue, desc: &ArrayDesc, order: Order) -> Result<ArrayValue> {
    let extents = value.extents().to_vec();
    let lower_bounds = value.lower_bounds().to_vec();
    let elements = value.into_elements();
    let mut reordered = vec![DbValue::Null; elements.len()];

    for row_major in 0..elements.len() {
        // Split the row-major offset into subscripts, then rebuild it with
        // the first dimension varying fastest.
        let mut rest = row_major;
        let mut subscripts = vec![0usize; extents.len()];
        for (dim, &extent) in extents.iter().enumerate().rev() {
            subscripts[dim] = rest % extent.max(1);
            rest /= extent.max(1);
        }
        let mut column_major = 0usize;
        for (dim, &extent) in extents.iter().enumerate().rev() {
            column_major = column_major * extent + subscripts[dim];
        }
        match order {
            Order::FromColumnMajor => reordered[row_major] = elements[column_major].clone(),
            Order::ToColumnMajor => reordered[column_major] = elements[row_major].clone(),
        }
    }

    ArrayValue::with_bounds(reordered, extents, lower_bounds).ok_or_else(|| {
        Error::InvalidDimensions {
            expected: desc.dimensions(),
            actual: 0,
        }
    })
}
