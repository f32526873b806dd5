//! Column / parameter metadata with its owned value.

use std::future::Future;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::array_desc::ArrayDesc;
use super::db_type::DbDataType;
use super::value::{ArrayValue, DbValue, FieldValue};
use crate::error::{Error, Result};
use crate::protocol::charset::{Charset, CharsetContext};
use crate::protocol::constants::*;

/// Fetches the payload behind a blob or array handle.
///
/// Implemented by the statement layer; `Field::materialize` calls into it
/// for unresolved values.
pub trait ValueResolver: Send {
    /// Read a whole blob and convert it for the field (text or bytes).
    fn read_blob(
        &mut self,
        field: &Field,
        blob_id: i64,
    ) -> impl Future<Output = Result<DbValue>> + Send;

    /// Look up the array shape of a table column.
    fn lookup_array(
        &mut self,
        relation: &str,
        column: &str,
    ) -> impl Future<Output = Result<ArrayDesc>> + Send;

    /// Read a whole array slice.
    fn read_array(
        &mut self,
        desc: &ArrayDesc,
        array_id: i64,
    ) -> impl Future<Output = Result<ArrayValue>> + Send;
}

/// Metadata of one column or parameter plus its current value.
#[derive(Debug, Clone)]
pub struct Field {
    sql_type: i32,
    nullable: bool,
    sub_type: i32,
    scale: i32,
    length: i32,
    char_count: i32,
    charset: Arc<Charset>,
    name: String,
    relation: String,
    owner: String,
    alias: String,
    value: FieldValue,
    array_desc: Option<ArrayDesc>,
}

fn trim_name(name: &str) -> String {
    name.trim_end_matches([' ', '\0']).to_string()
}

impl Field {
    /// Create an empty field using the given charset.
    pub fn new(charset: Arc<Charset>) -> Self {
        Self {
            sql_type: 0,
            nullable: false,
            sub_type: 0,
            scale: 0,
            length: 0,
            char_count: 0,
            charset,
            name: String::new(),
            relation: String::new(),
            owner: String::new(),
            alias: String::new(),
            value: FieldValue::default(),
            array_desc: None,
        }
    }

    /// Wire type tag with the nullable bit cleared.
    pub fn sql_type(&self) -> i32 {
        self.sql_type
    }

    /// Whether the column accepts NULL.
    pub fn nullable(&self) -> bool {
        self.nullable
    }

    /// Wire type tag with the nullable bit applied (as sent in BLR/XSQLDA).
    pub fn raw_sql_type(&self) -> i32 {
        self.sql_type | self.nullable as i32
    }

    /// Wire subtype (charset id for character kinds, BLOB subtype, or
    /// NUMERIC/DECIMAL marker for exact integers).
    pub fn sub_type(&self) -> i32 {
        self.sub_type
    }

    /// Decimal scale; negative for digits after the point.
    pub fn scale(&self) -> i32 {
        self.scale
    }

    /// Byte length of the value on the wire.
    pub fn length(&self) -> i32 {
        self.length
    }

    /// Declared length in characters (character kinds only).
    pub fn char_count(&self) -> i32 {
        self.char_count
    }

    /// Charset used to encode and decode text values.
    pub fn charset(&self) -> &Arc<Charset> {
        &self.charset
    }

    /// Column name as declared in the table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table (relation) the column belongs to.
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Owner of the relation.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Column alias from the select list.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Alias when present, otherwise the column name.
    pub fn column_name(&self) -> &str {
        if self.alias.is_empty() {
            &self.name
        } else {
            &self.alias
        }
    }

    /// Whether the wire type is TEXT or VARYING.
    pub fn is_character(&self) -> bool {
        matches!(self.sql_type, SQL_TEXT | SQL_VARYING)
    }

    /// Set the wire type; the low bit is the nullable flag.
    pub fn set_sql_type(&mut self, raw: i32) {
        self.sql_type = raw & !1;
        self.nullable = raw & 1 != 0;
    }

    /// Set the nullable flag explicitly.
    pub fn set_nullable(&mut self, nullable: bool) {
        self.nullable = nullable;
    }

    /// Set the subtype. For character kinds the low byte selects the charset.
    pub fn set_sub_type(&mut self, sub_type: i32, charsets: &CharsetContext) {
        self.sub_type = sub_type;
        if self.is_character() {
            self.charset = charsets.resolve((sub_type & 0xFF) as u8);
            self.update_char_count();
        }
    }

    /// Set the scale. Text BLOBs carry their charset id in this slot.
    pub fn set_scale(&mut self, scale: i32, charsets: &CharsetContext) {
        self.scale = scale;
        if self.sql_type == SQL_BLOB && self.sub_type == 1 {
            self.charset = charsets.resolve((scale & 0xFF) as u8);
        }
    }

    /// Set the byte length, recomputing the character count.
    pub fn set_length(&mut self, length: i32) {
        self.length = length;
        if self.is_character() {
            self.update_char_count();
        }
    }

    /// Replace the charset directly.
    pub fn set_charset(&mut self, charset: Arc<Charset>) {
        self.charset = charset;
        if self.is_character() {
            self.update_char_count();
        }
    }

    fn update_char_count(&mut self) {
        let bpc = self.charset.bytes_per_character().max(1) as i32;
        self.char_count = self.length / bpc;
    }

    /// Set the column name.
    pub fn set_name(&mut self, name: &str) {
        self.name = trim_name(name);
    }

    /// Set the relation name.
    pub fn set_relation(&mut self, relation: &str) {
        self.relation = trim_name(relation);
    }

    /// Set the relation owner.
    pub fn set_owner(&mut self, owner: &str) {
        self.owner = trim_name(owner);
    }

    /// Set the column alias.
    pub fn set_alias(&mut self, alias: &str) {
        self.alias = trim_name(alias);
    }

    /// Host kind of this field.
    ///
    /// A 16-byte CHAR in the OCTETS charset is a GUID.
    pub fn db_data_type(&self) -> Result<DbDataType> {
        if self.sql_type == SQL_TEXT && self.length == 16 && self.charset.is_octets() {
            return Ok(DbDataType::Guid);
        }
        DbDataType::from_wire(self.sql_type, self.sub_type, self.scale)
    }

    /// Current value storage.
    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    /// Replace the stored value.
    pub fn set_value(&mut self, value: FieldValue) {
        self.value = value;
    }

    /// Store a host value.
    pub fn set_db_value(&mut self, value: impl Into<DbValue>) {
        self.value = FieldValue::Resolved(value.into());
    }

    /// Take the stored value, leaving NULL behind.
    pub fn take_value(&mut self) -> FieldValue {
        std::mem::take(&mut self.value)
    }

    /// Whether the stored value is a resolved NULL.
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Cached array shape, if looked up.
    pub fn array_desc(&self) -> Option<&ArrayDesc> {
        self.array_desc.as_ref()
    }

    /// Cache the array shape for later slice reads.
    pub fn set_array_desc(&mut self, desc: ArrayDesc) {
        self.array_desc = Some(desc);
    }

    /// Drop the cached array shape.
    pub fn clear_array_desc(&mut self) {
        self.array_desc = None;
    }

    /// Resolve a blob/array handle into its payload, caching the result.
    ///
    /// Values that are already resolved are returned unchanged; a handle is
    /// fetched at most once.
    pub async fn materialize<R: ValueResolver>(&mut self, resolver: &mut R) -> Result<&DbValue> {
        if let FieldValue::Unresolved(handle) = self.value {
            let value = match self.db_data_type()? {
                DbDataType::Text | DbDataType::Binary => resolver.read_blob(self, handle).await?,
                DbDataType::Array => {
                    let desc = match self.array_desc.take() {
                        Some(desc) => desc,
                        None => resolver.lookup_array(&self.relation, &self.name).await?,
                    };
                    let array = resolver.read_array(&desc, handle).await;
                    self.array_desc = Some(desc);
                    DbValue::Array(array?)
                }
                _ => DbValue::BigInt(handle),
            };
            self.value = FieldValue::Resolved(value);
        }

        match &self.value {
            FieldValue::Resolved(value) => Ok(value),
            FieldValue::Unresolved(handle) => Err(Error::protocol(format!(
                "Handle {} was not resolved",
                handle
            ))),
        }
    }

    /// Replace a NULL on a NOT NULL field with the kind's zero value.
    ///
    /// Used for stored-procedure output rows, where an unassigned output
    /// parameter comes back as NULL regardless of its declaration.
    pub fn apply_null_default(&mut self) -> Result<()> {
        if !self.value.is_null() || self.nullable {
            return Ok(());
        }
        let zero = match self.db_data_type()? {
            DbDataType::Char | DbDataType::VarChar | DbDataType::Text => {
                DbValue::String(String::new())
            }
            DbDataType::SmallInt => DbValue::SmallInt(0),
            DbDataType::Integer => DbValue::Integer(0),
            DbDataType::BigInt => DbValue::BigInt(0),
            DbDataType::Numeric | DbDataType::Decimal => DbValue::Decimal(Decimal::ZERO),
            DbDataType::Float => DbValue::Float(0.0),
            DbDataType::Double => DbValue::Double(0.0),
            DbDataType::Date => DbValue::Date(epoch_date()),
            DbDataType::Time => DbValue::Time(NaiveTime::MIN),
            DbDataType::TimeStamp => DbValue::TimeStamp(epoch_date().and_time(NaiveTime::MIN)),
            DbDataType::Binary => DbValue::Binary(Vec::new()),
            DbDataType::Guid => DbValue::Guid(Uuid::nil()),
            DbDataType::Array => return Ok(()),
        };
        self.value = FieldValue::Resolved(zero);
        Ok(())
    }
}

fn epoch_date() -> NaiveDate {
    // 1858-11-17 is day zero of the wire DATE encoding
    NaiveDate::from_ymd_opt(1858, 11, 17).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::charset::CharsetRegistry;
    use crate::protocol::types::ArrayBound;

    fn ctx() -> CharsetContext {
        CharsetContext::new(Arc::new(CharsetRegistry::new()), "UTF8").unwrap()
    }

    fn field(ctx: &CharsetContext, raw_type: i32, sub_type: i32, length: i32) -> Field {
        let mut f = Field::new(Arc::clone(ctx.default_charset()));
        f.set_sql_type(raw_type);
        f.set_sub_type(sub_type, ctx);
        f.set_length(length);
        f
    }

    #[test]
    fn test_charset_and_char_count() {
        let ctx = ctx();
        // UTF8 id 4, collation bits in the high byte are ignored
        let f = field(&ctx, SQL_VARYING + 1, 0x0304, 40);
        assert!(f.nullable());
        assert_eq!(f.sql_type(), SQL_VARYING);
        assert_eq!(f.charset().name(), "UTF8");
        assert_eq!(f.char_count(), 10);

        let f = field(&ctx, SQL_TEXT, 53, 10);
        assert_eq!(f.charset().name(), "WIN1252");
        assert_eq!(f.char_count(), 10);
    }

    #[test]
    fn test_names_are_trimmed() {
        let mut f = Field::new(Arc::clone(ctx().default_charset()));
        f.set_name("ID   ");
        f.set_relation("ORDERS\0\0");
        f.set_alias("");
        assert_eq!(f.name(), "ID");
        assert_eq!(f.relation(), "ORDERS");
        assert_eq!(f.column_name(), "ID");
        f.set_alias("ORDER_ID ");
        assert_eq!(f.column_name(), "ORDER_ID");
    }

    #[test]
    fn test_guid_special_case() {
        let ctx = ctx();
        let f = field(&ctx, SQL_TEXT, CS_OCTETS as i32, 16);
        assert_eq!(f.db_data_type().unwrap(), DbDataType::Guid);
        let f = field(&ctx, SQL_TEXT, CS_OCTETS as i32, 15);
        assert_eq!(f.db_data_type().unwrap(), DbDataType::Char);
    }

    #[test]
    fn test_text_blob_charset_from_scale() {
        let ctx = ctx();
        let mut f = field(&ctx, SQL_BLOB, 1, 8);
        f.set_scale(53, &ctx);
        assert_eq!(f.charset().name(), "WIN1252");
        assert_eq!(f.db_data_type().unwrap(), DbDataType::Text);
    }

    #[test]
    fn test_apply_null_default() {
        let ctx = ctx();
        let mut not_null = field(&ctx, SQL_LONG, 0, 4);
        not_null.apply_null_default().unwrap();
        assert_eq!(not_null.value().resolved(), Some(&DbValue::Integer(0)));

        let mut date = field(&ctx, SQL_TYPE_DATE, 0, 4);
        date.apply_null_default().unwrap();
        assert_eq!(
            date.value().resolved(),
            Some(&DbValue::Date(NaiveDate::from_ymd_opt(1858, 11, 17).unwrap()))
        );

        let mut nullable = field(&ctx, SQL_LONG + 1, 0, 4);
        nullable.apply_null_default().unwrap();
        assert!(nullable.is_null());

        let mut guid = field(&ctx, SQL_TEXT, CS_OCTETS as i32, 16);
        guid.apply_null_default().unwrap();
        assert_eq!(guid.value().resolved(), Some(&DbValue::Guid(Uuid::nil())));
    }

    struct CountingResolver {
        blob_reads: usize,
        lookups: usize,
    }

    impl ValueResolver for CountingResolver {
        async fn read_blob(&mut self, _field: &Field, blob_id: i64) -> Result<DbValue> {
            self.blob_reads += 1;
            Ok(DbValue::String(format!("blob {}", blob_id)))
        }

        async fn lookup_array(&mut self, relation: &str, column: &str) -> Result<ArrayDesc> {
            self.lookups += 1;
            Ok(ArrayDesc {
                blr_type: BLR_LONG,
                scale: 0,
                length: 4,
                bounds: vec![ArrayBound::new(1, 2)],
                flags: 0,
                relation_name: relation.to_string(),
                field_name: column.to_string(),
            })
        }

        async fn read_array(&mut self, _desc: &ArrayDesc, _array_id: i64) -> Result<ArrayValue> {
            Ok(ArrayValue::from_vec(vec![DbValue::Integer(1), DbValue::Integer(2)]))
        }
    }

    #[test]
    fn test_materialize_resolves_once() {
        let ctx = ctx();
        let mut f = field(&ctx, SQL_BLOB, 1, 8);
        f.set_value(FieldValue::Unresolved(7));
        let mut resolver = CountingResolver {
            blob_reads: 0,
            lookups: 0,
        };

        tokio_test::block_on(async {
            let value = f.materialize(&mut resolver).await.unwrap().clone();
            assert_eq!(value, DbValue::String("blob 7".to_string()));
            f.materialize(&mut resolver).await.unwrap();
        });
        assert_eq!(resolver.blob_reads, 1);
    }

    #[test]
    fn test_materialize_array_caches_desc() {
        let ctx = ctx();
        let mut f = field(&ctx, SQL_ARRAY, 0, 8);
        f.set_name("SCORES");
        f.set_relation("PLAYERS");
        f.set_value(FieldValue::Unresolved(3));
        let mut resolver = CountingResolver {
            blob_reads: 0,
            lookups: 0,
        };

        tokio_test::block_on(async {
            let value = f.materialize(&mut resolver).await.unwrap();
            assert_eq!(value.as_array().map(|a| a.elements().len()), Some(2));
        });
        assert_eq!(resolver.lookups, 1);
        assert_eq!(f.array_desc().map(|d| d.field_name.as_str()), Some("SCORES"));

        // A second handle on the same field reuses the cached shape.
        f.set_value(FieldValue::Unresolved(4));
        tokio_test::block_on(async {
            f.materialize(&mut resolver).await.unwrap();
        });
        assert_eq!(resolver.lookups, 1);
    }
}
