//! Column metadata derived from the output descriptor.
//!
//! Columns are built once at prepare and shared by every fetched row.

use crate::error::Result;

use super::db_type::DbDataType;
use super::descriptor::Descriptor;
use super::field::Field;

/// One output column as seen by callers.
#[derive(Debug, Clone)]
pub struct Column {
    /// Column name as declared in the table.
    pub name: String,
    /// Alias given in the select list (empty when none).
    pub alias: String,
    /// Owning table.
    pub relation: String,
    /// Nullable flag from the SQL type's low bit.
    pub nullable: bool,
    /// Host data kind.
    pub data_type: DbDataType,
    /// Raw wire type tag (nullable bit cleared).
    pub sql_type: i32,
    /// Numeric scale.
    pub scale: i32,
    /// Byte length on the wire.
    pub length: i32,
}

impl Column {
    /// Create a column from a described field.
    ///
    /// Returns error if the wire type is not supported.
    pub fn from_field(field: &Field) -> Result<Self> {
        Ok(Self {
            name: field.name().to_string(),
            alias: field.alias().to_string(),
            relation: field.relation().to_string(),
            nullable: field.nullable(),
            data_type: field.db_data_type()?,
            sql_type: field.sql_type(),
            scale: field.scale(),
            length: field.length(),
        })
    }

    /// Alias when present, otherwise the column name.
    pub fn label(&self) -> &str {
        if self.alias.is_empty() {
            &self.name
        } else {
            &self.alias
        }
    }
}

/// Columns of a prepared statement, shared by its rows.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    /// Column definitions.
    pub columns: Vec<Column>,
}

impl ColumnInfo {
    /// Wrap a column list.
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Create column info from an output descriptor.
    ///
    /// Returns error if any column has an unsupported wire type.
    pub fn from_descriptor(descriptor: &Descriptor) -> Result<Self> {
        let columns: Result<Vec<Column>> = descriptor.iter().map(Column::from_field).collect();
        Ok(Self { columns: columns? })
    }

    /// Get column labels.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::label).collect()
    }

    /// Column count.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the statement returns no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get column by index.
    pub fn get(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Find column index by alias, then by name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.alias.eq_ignore_ascii_case(name))
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|c| c.name.eq_ignore_ascii_case(name))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::charset::CharsetContext;
    use crate::protocol::constants::{SQL_INT64, SQL_VARYING};

    fn make_test_descriptor() -> Descriptor {
        let ctx = CharsetContext::default();
        let mut desc = Descriptor::from_field_count(2, ctx.default_charset());

        let id = desc.get_mut(0).unwrap();
        id.set_sql_type(SQL_INT64);
        id.set_sub_type(1, &ctx);
        id.set_scale(-2, &ctx);
        id.set_length(8);
        id.set_name("ID");
        id.set_relation("ORDERS");

        let name = desc.get_mut(1).unwrap();
        name.set_sql_type(SQL_VARYING + 1);
        name.set_length(100);
        name.set_name("CUSTOMER_NAME");
        name.set_alias("NAME");

        desc
    }

    #[test]
    fn test_column_from_field() {
        let desc = make_test_descriptor();
        let col = Column::from_field(desc.get(0).unwrap()).unwrap();

        assert_eq!(col.name, "ID");
        assert_eq!(col.relation, "ORDERS");
        assert!(!col.nullable);
        assert_eq!(col.data_type, DbDataType::Numeric);
        assert_eq!(col.scale, -2);
    }

    #[test]
    fn test_column_info_from_descriptor() {
        let info = ColumnInfo::from_descriptor(&make_test_descriptor()).unwrap();

        assert_eq!(info.len(), 2);
        assert_eq!(info.column_names(), vec!["ID", "NAME"]);
        assert_eq!(info.find_by_name("name"), Some(1));
        assert_eq!(info.find_by_name("customer_name"), Some(1));
        assert_eq!(info.find_by_name("UNKNOWN"), None);
    }
}
