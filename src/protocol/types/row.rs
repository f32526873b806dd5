//! Fetched rows with materialized values.

use std::sync::Arc;

use super::column::{Column, ColumnInfo};
use super::value::DbValue;
use crate::error::{Error, Result};

/// A row of query results with every value materialized.
#[derive(Debug, Clone)]
pub struct Row {
    /// Column values.
    values: Vec<DbValue>,
    /// Column metadata shared by every row of the statement.
    column_info: Arc<ColumnInfo>,
}

impl Row {
    /// Wrap values fetched for `column_info`.
    pub fn new(values: Vec<DbValue>, column_info: Arc<ColumnInfo>) -> Self {
        Self {
            values,
            column_info,
        }
    }

    /// Value at a 0-based position.
    pub fn get(&self, index: usize) -> Option<&DbValue> {
        self.values.get(index)
    }

    /// Get value by column alias or name (case-insensitive).
    pub fn get_by_name(&self, name: &str) -> Option<&DbValue> {
        self.column_info
            .find_by_name(name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a non-NULL value by name, with typed errors for the miss cases.
    pub fn try_get(&self, name: &str) -> Result<&DbValue> {
        let value = self.get_by_name(name).ok_or_else(|| Error::ColumnNotFound {
            name: name.to_string(),
        })?;
        if value.is_null() {
            return Err(Error::NullValue {
                column: name.to_string(),
            });
        }
        Ok(value)
    }

    /// Column count.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get all values.
    pub fn values(&self) -> &[DbValue] {
        &self.values
    }

    /// Column metadata.
    pub fn columns(&self) -> &[Column] {
        &self.column_info.columns
    }

    /// Get column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.column_info.column_names()
    }

    /// Iterate over values.
    pub fn iter(&self) -> impl Iterator<Item = &DbValue> {
        self.values.iter()
    }
}

impl IntoIterator for Row {
    type Item = DbValue;
    type IntoIter = std::vec::IntoIter<DbValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a DbValue;
    type IntoIter = std::slice::Iter<'a, DbValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
