//! Firebird data types for rows and parameters.

mod array_desc;
mod column;
mod db_type;
mod descriptor;
mod field;
mod row;
mod value;

pub use array_desc::{ArrayBound, ArrayDesc};
pub use column::{Column, ColumnInfo};
pub use db_type::{blr_to_sql_type, DbDataType};
pub use descriptor::{Descriptor, DESCRIPTOR_VERSION};
pub use field::{Field, ValueResolver};
pub use row::Row;
pub use value::{ArrayValue, DbValue, FieldValue};
