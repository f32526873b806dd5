//! Info buffer parsing for statements.
//!
//! Info answers are little-endian tag/length/value sequences: an item byte,
//! a 2-byte length and the payload, terminated by `isc_info_end`. An
//! `isc_info_truncated` item means the answer did not fit the buffer.

use crate::error::{Error, Result};
use crate::protocol::buffer::vax_integer;
use crate::protocol::charset::{Charset, CharsetContext};
use crate::protocol::constants::*;
use crate::protocol::types::Descriptor;

/// Kind of a prepared statement as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
    GetSegment,
    PutSegment,
    StoredProcedure,
    StartTrans,
    Commit,
    Rollback,
    SelectForUpdate,
    SetGenerator,
    Savepoint,
    Unknown(i32),
}

impl StatementType {
    /// Map an `isc_info_sql_stmt_*` code.
    pub fn from_code(code: i32) -> Self {
        match code {
            ISC_INFO_SQL_STMT_SELECT => StatementType::Select,
            ISC_INFO_SQL_STMT_INSERT => StatementType::Insert,
            ISC_INFO_SQL_STMT_UPDATE => StatementType::Update,
            ISC_INFO_SQL_STMT_DELETE => StatementType::Delete,
            ISC_INFO_SQL_STMT_DDL => StatementType::Ddl,
            ISC_INFO_SQL_STMT_GET_SEGMENT => StatementType::GetSegment,
            ISC_INFO_SQL_STMT_PUT_SEGMENT => StatementType::PutSegment,
            ISC_INFO_SQL_STMT_EXEC_PROCEDURE => StatementType::StoredProcedure,
            ISC_INFO_SQL_STMT_START_TRANS => StatementType::StartTrans,
            ISC_INFO_SQL_STMT_COMMIT => StatementType::Commit,
            ISC_INFO_SQL_STMT_ROLLBACK => StatementType::Rollback,
            ISC_INFO_SQL_STMT_SELECT_FOR_UPD => StatementType::SelectForUpdate,
            ISC_INFO_SQL_STMT_SET_GENERATOR => StatementType::SetGenerator,
            ISC_INFO_SQL_STMT_SAVEPOINT => StatementType::Savepoint,
            other => StatementType::Unknown(other),
        }
    }

    /// Whether the statement opens a server-side cursor.
    pub fn is_cursor(&self) -> bool {
        matches!(self, StatementType::Select | StatementType::SelectForUpdate)
    }

    /// Whether `close()` has work to do for this type.
    pub fn is_closable(&self) -> bool {
        matches!(
            self,
            StatementType::Select | StatementType::SelectForUpdate | StatementType::StoredProcedure
        )
    }

    /// Whether `records_affected` asks the server for row counts.
    pub fn has_record_counts(&self) -> bool {
        matches!(
            self,
            StatementType::Insert
                | StatementType::Update
                | StatementType::Delete
                | StatementType::StoredProcedure
        )
    }
}

/// Items asking for the statement type.
pub const STMT_TYPE_ITEMS: &[u8] = &[ISC_INFO_SQL_STMT_TYPE];

/// Items asking for row counts.
pub const RECORDS_ITEMS: &[u8] = &[ISC_INFO_SQL_RECORDS];

/// Items asking for the execution plan.
pub const PLAN_ITEMS: &[u8] = &[ISC_INFO_SQL_GET_PLAN];

/// Describe block for the output (select) side.
pub const SELECT_DESCRIBE_ITEMS: &[u8] = &[
    ISC_INFO_SQL_SELECT,
    ISC_INFO_SQL_DESCRIBE_VARS,
    ISC_INFO_SQL_SQLDA_SEQ,
    ISC_INFO_SQL_TYPE,
    ISC_INFO_SQL_SUB_TYPE,
    ISC_INFO_SQL_SCALE,
    ISC_INFO_SQL_LENGTH,
    ISC_INFO_SQL_FIELD,
    ISC_INFO_SQL_RELATION,
    ISC_INFO_SQL_OWNER,
    ISC_INFO_SQL_ALIAS,
    ISC_INFO_SQL_DESCRIBE_END,
];

/// Describe block for the input (bind) side.
pub const BIND_DESCRIBE_ITEMS: &[u8] = &[
    ISC_INFO_SQL_BIND,
    ISC_INFO_SQL_DESCRIBE_VARS,
    ISC_INFO_SQL_SQLDA_SEQ,
    ISC_INFO_SQL_TYPE,
    ISC_INFO_SQL_SUB_TYPE,
    ISC_INFO_SQL_SCALE,
    ISC_INFO_SQL_LENGTH,
    ISC_INFO_SQL_FIELD,
    ISC_INFO_SQL_RELATION,
    ISC_INFO_SQL_OWNER,
    ISC_INFO_SQL_ALIAS,
    ISC_INFO_SQL_DESCRIBE_END,
];

/// Items sent with op_prepare_statement: type, then both describe blocks.
pub fn prepare_items() -> Vec<u8> {
    let mut items = Vec::with_capacity(1 + SELECT_DESCRIBE_ITEMS.len() + BIND_DESCRIBE_ITEMS.len());
    items.extend_from_slice(STMT_TYPE_ITEMS);
    items.extend_from_slice(SELECT_DESCRIBE_ITEMS);
    items.extend_from_slice(BIND_DESCRIBE_ITEMS);
    items
}

/// Describe items for one side, resuming at a 1-based field index.
pub fn describe_items(side: DescribeSide, start_index: usize) -> Vec<u8> {
    let block = match side {
        DescribeSide::Select => SELECT_DESCRIBE_ITEMS,
        DescribeSide::Bind => BIND_DESCRIBE_ITEMS,
    };
    let mut items = Vec::with_capacity(4 + block.len());
    if start_index > 1 {
        let index = start_index as u16;
        items.push(ISC_INFO_SQL_SQLDA_START);
        items.push(2);
        items.extend_from_slice(&index.to_le_bytes());
    }
    items.extend_from_slice(block);
    items
}

/// Cursor over an info answer.
struct InfoReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> InfoReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn item(&mut self) -> Result<u8> {
        let item = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::protocol("Info buffer ended unexpectedly"))?;
        self.pos += 1;
        Ok(item)
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos + len;
        if end > self.data.len() {
            return Err(Error::protocol(format!(
                "Info item of {} bytes overruns buffer of {} bytes",
                len,
                self.data.len()
            )));
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn length(&mut self) -> Result<usize> {
        Ok(vax_integer(self.bytes(2)?) as usize)
    }

    /// Length-prefixed integer.
    fn int(&mut self) -> Result<i64> {
        let len = self.length()?;
        Ok(vax_integer(self.bytes(len)?))
    }

    /// Length-prefixed string in the given charset.
    fn string(&mut self, charset: &Charset) -> Result<String> {
        let len = self.length()?;
        charset.decode(self.bytes(len)?)
    }
}

/// Parse an answer to `STMT_TYPE_ITEMS`.
pub fn parse_statement_type(data: &[u8]) -> Result<StatementType> {
    let mut reader = InfoReader::new(data);
    while !reader.at_end() {
        match reader.item()? {
            ISC_INFO_SQL_STMT_TYPE => return Ok(StatementType::from_code(reader.int()? as i32)),
            ISC_INFO_END => break,
            ISC_INFO_TRUNCATED => return Err(Error::protocol("Statement type answer truncated")),
            other => {
                let len = reader.length()?;
                reader.bytes(len)?;
                tracing::trace!(item = other, "skipping info item");
            }
        }
    }
    Err(Error::protocol("Statement type missing from info answer"))
}

/// Row counts from `isc_info_sql_records`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub select: i64,
    pub insert: i64,
    pub update: i64,
    pub delete: i64,
}

impl RecordCounts {
    /// Rows changed by the statement (select count excluded).
    pub fn affected(&self) -> i64 {
        self.insert + self.update + self.delete
    }
}

/// Parse an answer to `RECORDS_ITEMS`.
pub fn parse_record_counts(data: &[u8]) -> Result<RecordCounts> {
    let mut counts = RecordCounts::default();
    let mut reader = InfoReader::new(data);
    while !reader.at_end() {
        match reader.item()? {
            ISC_INFO_SQL_RECORDS => {
                let len = reader.length()?;
                let mut nested = InfoReader::new(reader.bytes(len)?);
                while !nested.at_end() {
                    let item = nested.item()?;
                    if item == ISC_INFO_END {
                        break;
                    }
                    let count = nested.int()?;
                    match item {
                        ISC_INFO_REQ_SELECT_COUNT => counts.select = count,
                        ISC_INFO_REQ_INSERT_COUNT => counts.insert = count,
                        ISC_INFO_REQ_UPDATE_COUNT => counts.update = count,
                        ISC_INFO_REQ_DELETE_COUNT => counts.delete = count,
                        _ => {}
                    }
                }
            }
            ISC_INFO_END => break,
            ISC_INFO_TRUNCATED => return Err(Error::protocol("Record count answer truncated")),
            other => {
                return Err(Error::protocol(format!(
                    "Unexpected item {} in record count answer",
                    other
                )))
            }
        }
    }
    Ok(counts)
}

/// Outcome of a plan request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanInfo {
    /// Plan text.
    Plan(String),
    /// The answer did not fit; retry with a larger buffer.
    Truncated,
    /// The server has no plan for the statement.
    Empty,
}

/// Parse an answer to `PLAN_ITEMS`.
///
/// The plan text starts with a newline which is dropped.
pub fn parse_plan(data: &[u8], charset: &Charset) -> Result<PlanInfo> {
    match data.first() {
        None | Some(&ISC_INFO_END) => Ok(PlanInfo::Empty),
        Some(&ISC_INFO_TRUNCATED) => Ok(PlanInfo::Truncated),
        Some(&ISC_INFO_SQL_GET_PLAN) => {
            if data.len() < 3 {
                return Ok(PlanInfo::Truncated);
            }
            let len = vax_integer(&data[1..3]) as usize;
            if len == 0 {
                return Ok(PlanInfo::Empty);
            }
            if 3 + len > data.len() {
                return Ok(PlanInfo::Truncated);
            }
            let text = &data[3..3 + len];
            let text = text.strip_prefix(b"\n").unwrap_or(text);
            Ok(PlanInfo::Plan(charset.decode(text)?))
        }
        Some(other) => Err(Error::protocol(format!(
            "Unexpected item {} in plan answer",
            other
        ))),
    }
}

/// Which side of a statement a describe block covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescribeSide {
    /// Output columns.
    Select,
    /// Input parameters.
    Bind,
}

/// Describe progress of one side.
#[derive(Debug, Clone, Default)]
pub struct SideDescription {
    /// Fields described so far.
    pub descriptor: Option<Descriptor>,
    /// Number of leading fields fully described.
    pub complete: usize,
}

impl SideDescription {
    /// Whether every field has been described.
    pub fn is_complete(&self) -> bool {
        self.descriptor
            .as_ref()
            .is_some_and(|d| self.complete >= d.count())
    }
}

/// Accumulated result of one or more describe answers.
#[derive(Debug, Clone, Default)]
pub struct DescribeInfo {
    pub statement_type: Option<StatementType>,
    pub select: SideDescription,
    pub bind: SideDescription,
}

impl DescribeInfo {
    fn side_mut(&mut self, side: DescribeSide) -> &mut SideDescription {
        match side {
            DescribeSide::Select => &mut self.select,
            DescribeSide::Bind => &mut self.bind,
        }
    }

    /// Next request needed to finish describing, if any.
    pub fn pending(&self) -> Option<(DescribeSide, usize)> {
        if !self.select.is_complete() {
            return Some((DescribeSide::Select, self.select.complete + 1));
        }
        if !self.bind.is_complete() {
            return Some((DescribeSide::Bind, self.bind.complete + 1));
        }
        None
    }
}

/// Parse a describe answer into `info`.
///
/// Returns `true` when the answer was truncated; `info.pending()` then
/// names the side and 1-based index to resume from.
pub fn parse_describe(
    data: &[u8],
    info: &mut DescribeInfo,
    charsets: &CharsetContext,
) -> Result<bool> {
    let names = charsets.default_charset();
    let mut reader = InfoReader::new(data);
    let mut side: Option<DescribeSide> = None;
    let mut index = 0usize;

    while !reader.at_end() {
        let item = reader.item()?;
        match item {
            ISC_INFO_END => break,
            ISC_INFO_TRUNCATED => return Ok(true),
            ISC_INFO_ERROR => return Err(Error::protocol("Server reported an info error")),
            ISC_INFO_SQL_STMT_TYPE => {
                info.statement_type = Some(StatementType::from_code(reader.int()? as i32));
            }
            ISC_INFO_SQL_SELECT => side = Some(DescribeSide::Select),
            ISC_INFO_SQL_BIND => side = Some(DescribeSide::Bind),
            ISC_INFO_SQL_DESCRIBE_VARS => {
                let count = reader.int()?.max(0) as usize;
                let current = info.side_mut(current_side(side)?);
                let descriptor = current
                    .descriptor
                    .get_or_insert_with(|| Descriptor::from_field_count(count, names));
                descriptor.set_actual_count(count);
            }
            ISC_INFO_SQL_SQLDA_SEQ => {
                let seq = reader.int()?;
                if seq < 1 {
                    return Err(Error::protocol(format!("Invalid sqlda sequence {}", seq)));
                }
                index = seq as usize - 1;
            }
            ISC_INFO_SQL_DESCRIBE_END => {
                let current = info.side_mut(current_side(side)?);
                current.complete = current.complete.max(index + 1);
            }
            ISC_INFO_SQL_TYPE
            | ISC_INFO_SQL_SUB_TYPE
            | ISC_INFO_SQL_SCALE
            | ISC_INFO_SQL_LENGTH
            | ISC_INFO_SQL_FIELD
            | ISC_INFO_SQL_RELATION
            | ISC_INFO_SQL_OWNER
            | ISC_INFO_SQL_ALIAS => {
                let current = info.side_mut(current_side(side)?);
                let descriptor = current
                    .descriptor
                    .as_mut()
                    .ok_or_else(|| Error::protocol("Field described before variable count"))?;
                let field = descriptor.get_mut(index)?;
                match item {
                    ISC_INFO_SQL_TYPE => field.set_sql_type(reader.int()? as i32),
                    ISC_INFO_SQL_SUB_TYPE => field.set_sub_type(reader.int()? as i32, charsets),
                    ISC_INFO_SQL_SCALE => field.set_scale(reader.int()? as i32, charsets),
                    ISC_INFO_SQL_LENGTH => field.set_length(reader.int()? as i32),
                    ISC_INFO_SQL_FIELD => field.set_name(&reader.string(names)?),
                    ISC_INFO_SQL_RELATION => field.set_relation(&reader.string(names)?),
                    ISC_INFO_SQL_OWNER => field.set_owner(&reader.string(names)?),
                    _ => field.set_alias(&reader.string(names)?),
                }
            }
            other => {
                // Items we did not ask for still carry a length.
                let len = reader.length()?;
                reader.bytes(len)?;
                tracing::trace!(item = other, "skipping describe item");
            }
        }
    }
    Ok(false)
}

fn current_side(side: Option<DescribeSide>) -> Result<DescribeSide> {
    side.ok_or_else(|| Error::protocol("Describe item outside select/bind block"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::charset::CharsetRegistry;
    use std::sync::Arc;

    fn int_item(out: &mut Vec<u8>, item: u8, value: i32) {
        out.push(item);
        out.extend_from_slice(&4u16.to_le_bytes());
        out.extend_from_slice(&value.to_le_bytes());
    }

    fn str_item(out: &mut Vec<u8>, item: u8, value: &str) {
        out.push(item);
        out.extend_from_slice(&(value.len() as u16).to_le_bytes());
        out.extend_from_slice(value.as_bytes());
    }

    fn describe_var(out: &mut Vec<u8>, seq: i32, sql_type: i32, length: i32, name: &str) {
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

    fn ctx() -> CharsetContext {
        CharsetContext::new(Arc::new(CharsetRegistry::new()), "UTF8").unwrap()
    }

    #[test]
    fn test_statement_type() {
        let mut data = Vec::new();
        int_item(&mut data, ISC_INFO_SQL_STMT_TYPE, ISC_INFO_SQL_STMT_EXEC_PROCEDURE);
        data.push(ISC_INFO_END);
        assert_eq!(
            parse_statement_type(&data).unwrap(),
            StatementType::StoredProcedure
        );
    }

    #[test]
    fn test_record_counts_exclude_select() {
        let mut nested = Vec::new();
        int_item(&mut nested, ISC_INFO_REQ_SELECT_COUNT, 10);
        int_item(&mut nested, ISC_INFO_REQ_INSERT_COUNT, 1);
        int_item(&mut nested, ISC_INFO_REQ_UPDATE_COUNT, 2);
        int_item(&mut nested, ISC_INFO_REQ_DELETE_COUNT, 3);
        nested.push(ISC_INFO_END);

        let mut data = vec![ISC_INFO_SQL_RECORDS];
        data.extend_from_slice(&(nested.len() as u16).to_le_bytes());
        data.extend_from_slice(&nested);
        data.push(ISC_INFO_END);

        let counts = parse_record_counts(&data).unwrap();
        assert_eq!(counts.select, 10);
        assert_eq!(counts.affected(), 6);
    }

    #[test]
    fn test_plan_parsing() {
        let charset = ctx().default_charset().clone();
        let text = "\nPLAN (T NATURAL)";
        let mut data = vec![ISC_INFO_SQL_GET_PLAN];
        data.extend_from_slice(&(text.len() as u16).to_le_bytes());
        data.extend_from_slice(text.as_bytes());
        data.push(ISC_INFO_END);
        assert_eq!(
            parse_plan(&data, &charset).unwrap(),
            PlanInfo::Plan("PLAN (T NATURAL)".to_string())
        );
        assert_eq!(
            parse_plan(&[ISC_INFO_TRUNCATED], &charset).unwrap(),
            PlanInfo::Truncated
        );
        assert_eq!(parse_plan(&[ISC_INFO_END], &charset).unwrap(), PlanInfo::Empty);
    }

    #[test]
    fn test_describe_complete() {
        let mut data = Vec::new();
        int_item(&mut data, ISC_INFO_SQL_STMT_TYPE, ISC_INFO_SQL_STMT_SELECT);
        data.push(ISC_INFO_SQL_SELECT);
        int_item(&mut data, ISC_INFO_SQL_DESCRIBE_VARS, 2);
        describe_var(&mut data, 1, SQL_LONG, 4, "ID");
        describe_var(&mut data, 2, SQL_VARYING + 1, 40, "NAME   ");
        data.push(ISC_INFO_SQL_BIND);
        int_item(&mut data, ISC_INFO_SQL_DESCRIBE_VARS, 0);
        data.push(ISC_INFO_END);

        let mut info = DescribeInfo::default();
        let truncated = parse_describe(&data, &mut info, &ctx()).unwrap();
        assert!(!truncated);
        assert_eq!(info.statement_type, Some(StatementType::Select));
        assert!(info.pending().is_none());

        let select = info.select.descriptor.unwrap();
        assert_eq!(select.count(), 2);
        assert_eq!(select.get(1).unwrap().name(), "NAME");
        assert!(select.get(1).unwrap().nullable());
        assert_eq!(info.bind.descriptor.unwrap().count(), 0);
    }

    #[test]
    fn test_describe_truncated_then_resumed() {
        let ctx = ctx();
        let mut first = Vec::new();
        int_item(&mut first, ISC_INFO_SQL_STMT_TYPE, ISC_INFO_SQL_STMT_SELECT);
        first.push(ISC_INFO_SQL_SELECT);
        int_item(&mut first, ISC_INFO_SQL_DESCRIBE_VARS, 3);
        describe_var(&mut first, 1, SQL_LONG, 4, "A");
        int_item(&mut first, ISC_INFO_SQL_SQLDA_SEQ, 2);
        int_item(&mut first, ISC_INFO_SQL_TYPE, SQL_LONG);
        first.push(ISC_INFO_TRUNCATED);

        let mut info = DescribeInfo::default();
        assert!(parse_describe(&first, &mut info, &ctx).unwrap());
        assert_eq!(info.pending(), Some((DescribeSide::Select, 2)));

        let items = describe_items(DescribeSide::Select, 2);
        assert_eq!(&items[..4], &[ISC_INFO_SQL_SQLDA_START, 2, 2, 0]);

        let mut second = vec![ISC_INFO_SQL_SELECT];
        int_item(&mut second, ISC_INFO_SQL_DESCRIBE_VARS, 3);
        describe_var(&mut second, 2, SQL_SHORT, 2, "B");
        describe_var(&mut second, 3, SQL_INT64, 8, "C");
        second.push(ISC_INFO_END);
        assert!(!parse_describe(&second, &mut info, &ctx).unwrap());

        // The bind side was never described.
        assert_eq!(info.pending(), Some((DescribeSide::Bind, 1)));
        let select = info.select.descriptor.as_ref().unwrap();
        assert_eq!(select.get(0).unwrap().name(), "A");
        assert_eq!(select.get(2).unwrap().sql_type(), SQL_INT64);
    }
}
