//! Prepared statement lifecycle.
//!
//! A statement moves through `Deallocated -> Allocated -> Prepared ->
//! Executed -> Closed`, with `Error` entered when execute or fetch fails.
//! Every operation takes the attachment by `&mut`, so one request is in
//! flight at a time.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::array::{self, ArrayColumn};
use crate::blob::{self, Blob};
use crate::database::Database;
use crate::error::{Error, Result};
use crate::protocol::codec::write_row;
use crate::protocol::constants::*;
use crate::protocol::info::{
    describe_items, parse_describe, parse_plan, parse_record_counts, prepare_items, DescribeInfo,
    PlanInfo, PLAN_ITEMS, RECORDS_ITEMS,
};
use crate::protocol::messages::{
    ExecuteMessage, FetchMessage, FreeStatementMessage, HandleMessage, InfoSqlMessage,
    PrepareMessage,
};
use crate::protocol::response::{parse_fetch_response, parse_response, parse_sql_response};
use crate::protocol::transport::Transport;
use crate::protocol::types::{
    ArrayDesc, ArrayValue, ColumnInfo, DbDataType, DbValue, Descriptor, Field, FieldValue, Row,
    ValueResolver,
};
use crate::transaction::{Transaction, TransactionBinding};

pub use crate::protocol::info::StatementType;

/// Lifecycle state of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementState {
    Deallocated,
    Allocated,
    Prepared,
    Executed,
    Closed,
    Error,
}

/// A server-side prepared statement.
#[derive(Debug)]
pub struct Statement {
    handle: i32,
    state: StatementState,
    statement_type: StatementType,
    parameters: Descriptor,
    fields: Descriptor,
    columns: Option<Arc<ColumnInfo>>,
    transaction: Option<TransactionBinding>,
    rows: VecDeque<Descriptor>,
    all_rows_fetched: bool,
    output_row: Option<Descriptor>,
    created_handles: Vec<i64>,
    fetch_size: u32,
}

impl Statement {
    /// Create a deallocated statement fetching `fetch_size` rows per batch.
    pub fn new(fetch_size: u32) -> Self {
        Self {
            handle: 0,
            state: StatementState::Deallocated,
            statement_type: StatementType::Unknown(0),
            parameters: Descriptor::empty(),
            fields: Descriptor::empty(),
            columns: None,
            transaction: None,
            rows: VecDeque::new(),
            all_rows_fetched: false,
            output_row: None,
            created_handles: Vec::new(),
            fetch_size: fetch_size.max(1),
        }
    }

    /// Create a statement using the attachment's fetch size.
    pub fn for_database<T: Transport>(db: &Database<T>) -> Self {
        Self::new(db.params().fetch_size)
    }

    /// Server-side statement handle.
    pub fn handle(&self) -> i32 {
        self.handle
    }

    /// Current state.
    pub fn state(&self) -> StatementState {
        self.state
    }

    /// Statement kind reported at prepare.
    pub fn statement_type(&self) -> StatementType {
        self.statement_type
    }

    /// Input parameters.
    pub fn parameters(&self) -> &Descriptor {
        &self.parameters
    }

    /// Input parameters, for assigning values before `execute`.
    pub fn parameters_mut(&mut self) -> &mut Descriptor {
        &mut self.parameters
    }

    /// Set parameter `index` (0-based).
    pub fn set_parameter(&mut self, index: usize, value: impl Into<DbValue>) -> Result<()> {
        self.parameters.get_mut(index)?.set_db_value(value);
        Ok(())
    }

    /// Output fields.
    pub fn fields(&self) -> &Descriptor {
        &self.fields
    }

    /// Shared column metadata for rows returned by `fetch`.
    pub fn columns(&self) -> Option<&Arc<ColumnInfo>> {
        self.columns.as_ref()
    }

    /// Blob and array ids created through this statement since the last
    /// close.
    pub fn created_handles(&self) -> &[i64] {
        &self.created_handles
    }

    /// Rows requested per op_fetch.
    pub fn fetch_size(&self) -> u32 {
        self.fetch_size
    }

    /// Change the rows requested per op_fetch.
    pub fn set_fetch_size(&mut self, fetch_size: u32) {
        self.fetch_size = fetch_size.max(1);
    }

    /// Handle of the bound transaction.
    pub fn transaction_handle(&self) -> Option<i32> {
        self.transaction.as_ref().map(TransactionBinding::handle)
    }

    /// Bind the statement to another transaction.
    pub fn set_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        if !transaction.is_active() {
            return Err(Error::NoTransaction);
        }
        self.transaction = Some(transaction.bind());
        Ok(())
    }

    fn transition(&mut self, next: StatementState) {
        if self.state != next {
            tracing::trace!(handle = self.handle, from = ?self.state, to = ?next, "statement state");
        }
        self.state = next;
    }

    fn invalid(&self, operation: &'static str) -> Error {
        Error::InvalidState {
            operation,
            state: self.state,
        }
    }

    fn tx_handle(&self) -> Result<i32> {
        self.transaction
            .as_ref()
            .map(TransactionBinding::handle)
            .ok_or(Error::NoTransaction)
    }

    fn discard_results(&mut self) {
        self.rows.clear();
        self.output_row = None;
        self.all_rows_fetched = false;
    }

    /// React to a commit or rollback of the bound transaction.
    fn sync_transaction(&mut self) {
        let finished = self
            .transaction
            .as_ref()
            .is_some_and(TransactionBinding::is_finished);
        if !finished {
            return;
        }
        self.transaction = None;
        self.discard_results();
        self.fields.clear_array_handles();
        self.created_handles.clear();
        if !matches!(
            self.state,
            StatementState::Deallocated | StatementState::Allocated
        ) {
            self.transition(StatementState::Closed);
        }
    }

    /// Allocate the server-side statement.
    pub async fn allocate<T: Transport>(&mut self, db: &mut Database<T>) -> Result<()> {
        if self.state != StatementState::Deallocated {
            return Err(self.invalid("allocate"));
        }
        let response = db
            .execute(&HandleMessage::new(OP_ALLOCATE_STATEMENT, db.handle()))
            .await?;
        self.handle = response.handle;
        self.transition(StatementState::Allocated);
        Ok(())
    }

    /// Prepare `sql` in `transaction`, allocating first when needed.
    pub async fn prepare<T: Transport>(
        &mut self,
        db: &mut Database<T>,
        transaction: &Transaction,
        sql: &str,
    ) -> Result<()> {
        if !transaction.is_active() {
            return Err(Error::NoTransaction);
        }
        self.prepare_bound(db, transaction.bind(), sql).await
    }

    pub(crate) async fn prepare_bound<T: Transport>(
        &mut self,
        db: &mut Database<T>,
        binding: TransactionBinding,
        sql: &str,
    ) -> Result<()> {
        self.sync_transaction();
        match self.state {
            StatementState::Deallocated => self.allocate(db).await?,
            StatementState::Allocated | StatementState::Prepared | StatementState::Closed => {}
            _ => return Err(self.invalid("prepare")),
        }

        let info = match self.describe(db, binding.handle(), sql).await {
            Ok(info) => info,
            Err(e) => {
                self.transition(StatementState::Allocated);
                return Err(e);
            }
        };

        self.statement_type = info
            .statement_type
            .ok_or_else(|| Error::protocol("Prepare answer lacks the statement type"))?;
        self.fields = info.select.descriptor.unwrap_or_else(Descriptor::empty);
        self.parameters = info.bind.descriptor.unwrap_or_else(Descriptor::empty);
        self.columns = Some(Arc::new(ColumnInfo::from_descriptor(&self.fields)?));
        self.transaction = Some(binding);
        self.created_handles.clear();
        self.discard_results();
        self.transition(StatementState::Prepared);

        tracing::debug!(
            handle = self.handle,
            statement_type = ?self.statement_type,
            fields = self.fields.count(),
            parameters = self.parameters.count(),
            "statement prepared"
        );
        Ok(())
    }

    /// Send op_prepare_statement and complete the describe, following
    /// truncated answers with op_info_sql.
    async fn describe<T: Transport>(
        &self,
        db: &mut Database<T>,
        tx_handle: i32,
        sql: &str,
    ) -> Result<DescribeInfo> {
        let sql = db.charsets().default_charset().encode(sql)?;
        let items = prepare_items();
        let response = db
            .execute(&PrepareMessage {
                tx_handle,
                stmt_handle: self.handle,
                dialect: db.dialect(),
                sql: &sql,
                items: &items,
                buffer_size: MAX_BUFFER_SIZE,
            })
            .await?;

        let mut info = DescribeInfo::default();
        parse_describe(&response.data, &mut info, db.charsets())?;

        while let Some((side, start)) = info.pending() {
            let before = describe_progress(&info);
            tracing::debug!(handle = self.handle, ?side, start, "describe continues");
            let items = describe_items(side, start);
            let response = db
                .execute(&InfoSqlMessage {
                    stmt_handle: self.handle,
                    items: &items,
                    buffer_size: MAX_BUFFER_SIZE,
                })
                .await?;
            parse_describe(&response.data, &mut info, db.charsets())?;
            if describe_progress(&info) == before {
                return Err(Error::protocol("Describe answer made no progress"));
            }
        }
        Ok(info)
    }

    fn check_executable(&mut self) -> Result<i32> {
        self.sync_transaction();
        match self.state {
            StatementState::Prepared | StatementState::Closed => {}
            StatementState::Executed if !self.statement_type.is_cursor() => {}
            _ => return Err(self.invalid("execute")),
        }
        self.tx_handle()
    }

    /// Execute with the current parameter values.
    ///
    /// Blob and array parameters given as host values are stored first and
    /// replaced by their ids.
    pub async fn execute<T: Transport>(&mut self, db: &mut Database<T>) -> Result<()> {
        let tx_handle = self.check_executable()?;
        let result = match self.store_handle_parameters(db, tx_handle).await {
            Ok(()) => self.send_execute(db, tx_handle).await,
            Err(e) => Err(e),
        };
        self.finish_execute(result)
    }

    /// Execute without storing blob or array parameters.
    pub(crate) async fn execute_prepared<T: Transport>(
        &mut self,
        db: &mut Database<T>,
    ) -> Result<()> {
        let tx_handle = self.check_executable()?;
        let result = self.send_execute(db, tx_handle).await;
        self.finish_execute(result)
    }

    fn finish_execute(&mut self, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.transition(StatementState::Executed);
                Ok(())
            }
            Err(e) => {
                self.transition(StatementState::Error);
                Err(e)
            }
        }
    }

    async fn store_handle_parameters<T: Transport>(
        &mut self,
        db: &mut Database<T>,
        tx_handle: i32,
    ) -> Result<()> {
        for index in 0..self.parameters.count() {
            let field = self.parameters.get(index)?;
            let value = match field.value() {
                FieldValue::Resolved(value) if !value.is_null() => value.clone(),
                _ => continue,
            };

            let id = match field.sql_type() {
                SQL_BLOB => {
                    let data = match value {
                        DbValue::String(text) => field.charset().encode(&text)?,
                        DbValue::Binary(bytes) => bytes,
                        other => {
                            return Err(Error::type_conversion(format!(
                                "Cannot store {:?} in a blob parameter",
                                other
                            )))
                        }
                    };
                    blob::write_blob(db, tx_handle, &data).await?
                }
                SQL_ARRAY => {
                    let DbValue::Array(array) = value else {
                        return Err(Error::type_conversion(format!(
                            "Cannot store {:?} in an array parameter",
                            value
                        )));
                    };
                    let relation = field.relation().to_string();
                    let name = field.name().to_string();
                    let desc = match field.array_desc().cloned() {
                        Some(desc) => desc,
                        None => {
                            let binding = self.transaction.clone().ok_or(Error::NoTransaction)?;
                            ArrayColumn::lookup_descriptor(db, &binding, &relation, &name).await?
                        }
                    };
                    let id = array::write_array(db, tx_handle, &desc, &array).await?;
                    self.parameters.get_mut(index)?.set_array_desc(desc);
                    id
                }
                _ => continue,
            };

            self.created_handles.push(id);
            self.parameters
                .get_mut(index)?
                .set_value(FieldValue::Unresolved(id));
        }
        Ok(())
    }

    async fn send_execute<T: Transport>(
        &mut self,
        db: &mut Database<T>,
        tx_handle: i32,
    ) -> Result<()> {
        let (input_blr, input_row) = if self.parameters.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            let mut row = Vec::new();
            write_row(&mut row, &self.parameters)?;
            (self.parameters.to_blr()?, row)
        };
        self.discard_results();

        if self.statement_type == StatementType::StoredProcedure {
            let output_blr = self.fields.to_blr()?;
            let mut buf = db
                .request(&ExecuteMessage {
                    stmt_handle: self.handle,
                    tx_handle,
                    input_blr: &input_blr,
                    input_row: &input_row,
                    output_blr: Some(&output_blr),
                })
                .await?;
            let row = parse_sql_response(&mut buf, &self.fields)?;
            parse_response(&mut buf)?;
            if let Some(mut row) = row {
                for field in row.iter_mut() {
                    field.apply_null_default()?;
                }
                self.output_row = Some(row);
            }
        } else {
            db.execute(&ExecuteMessage {
                stmt_handle: self.handle,
                tx_handle,
                input_blr: &input_blr,
                input_row: &input_row,
                output_blr: None,
            })
            .await?;
        }

        tracing::debug!(
            handle = self.handle,
            statement_type = ?self.statement_type,
            parameters = self.parameters.count(),
            "statement executed"
        );
        Ok(())
    }

    /// Fetch the next row with blob and array values materialized.
    pub async fn fetch<T: Transport>(&mut self, db: &mut Database<T>) -> Result<Option<Row>> {
        let Some(mut row) = self.fetch_raw(db).await? else {
            return Ok(None);
        };
        let binding = self.transaction.clone().ok_or(Error::NoTransaction)?;
        let mut resolver = StatementResolver {
            db,
            transaction: &binding,
        };

        let mut values = Vec::with_capacity(row.count());
        for (index, field) in row.iter_mut().enumerate() {
            // Rows buffered before the shape was loaded still lack it.
            if field.array_desc().is_none() {
                if let Some(desc) = self.fields.get(index)?.array_desc() {
                    field.set_array_desc(desc.clone());
                }
            }
            match field.materialize(&mut resolver).await {
                Ok(value) => values.push(value.clone()),
                Err(e) => {
                    self.transition(StatementState::Error);
                    return Err(e);
                }
            }
            // Keep the array shape for later rows.
            if let Some(desc) = field.array_desc() {
                let template = self.fields.get_mut(index)?;
                if template.array_desc().is_none() {
                    template.set_array_desc(desc.clone());
                }
            }
        }

        let columns = match &self.columns {
            Some(columns) => columns.clone(),
            None => Arc::new(ColumnInfo::from_descriptor(&self.fields)?),
        };
        Ok(Some(Row::new(values, columns)))
    }

    /// Fetch the next row as a descriptor with raw handles left unresolved.
    pub(crate) async fn fetch_raw<T: Transport>(
        &mut self,
        db: &mut Database<T>,
    ) -> Result<Option<Descriptor>> {
        self.sync_transaction();
        if self.state != StatementState::Executed {
            return Err(self.invalid("fetch"));
        }
        match self.statement_type {
            StatementType::StoredProcedure => Ok(self.output_row.take()),
            kind if kind.is_cursor() => {
                if self.rows.is_empty() && !self.all_rows_fetched {
                    if let Err(e) = self.fetch_batch(db).await {
                        self.transition(StatementState::Error);
                        return Err(e);
                    }
                }
                Ok(self.rows.pop_front())
            }
            _ => Err(self.invalid("fetch")),
        }
    }

    async fn fetch_batch<T: Transport>(&mut self, db: &mut Database<T>) -> Result<()> {
        let blr = self.fields.to_blr()?;
        let mut buf = db
            .request(&FetchMessage {
                stmt_handle: self.handle,
                blr: &blr,
                fetch_size: self.fetch_size as i32,
            })
            .await?;
        let batch = parse_fetch_response(&mut buf, &self.fields)?;
        tracing::trace!(
            handle = self.handle,
            rows = batch.rows.len(),
            exhausted = batch.exhausted,
            "fetched batch"
        );
        self.all_rows_fetched = batch.exhausted || batch.rows.is_empty();
        self.rows.extend(batch.rows);
        Ok(())
    }

    /// Close the cursor of a select or procedure statement.
    ///
    /// A no-op for other statement types and for statements that were not
    /// executed.
    pub async fn close<T: Transport>(&mut self, db: &mut Database<T>) -> Result<()> {
        self.sync_transaction();
        if !self.statement_type.is_closable()
            || !matches!(
                self.state,
                StatementState::Executed | StatementState::Error
            )
        {
            return Ok(());
        }

        let result = db
            .execute(&FreeStatementMessage {
                stmt_handle: self.handle,
                option: DSQL_CLOSE,
            })
            .await;
        self.discard_results();
        self.fields.clear_array_handles();
        self.created_handles.clear();

        match result {
            Ok(_) => {
                self.transition(StatementState::Closed);
                Ok(())
            }
            Err(e) => {
                self.transition(StatementState::Error);
                Err(e)
            }
        }
    }

    /// Drop the server-side statement. Always ends `Deallocated`.
    pub async fn release<T: Transport>(&mut self, db: &mut Database<T>) -> Result<()> {
        let result = if self.state != StatementState::Deallocated {
            db.execute(&FreeStatementMessage {
                stmt_handle: self.handle,
                option: DSQL_DROP,
            })
            .await
            .map(|_| ())
        } else {
            Ok(())
        };

        if let Err(e) = &result {
            tracing::warn!(handle = self.handle, error = %e, "statement drop failed");
        }
        self.transaction = None;
        self.discard_results();
        self.created_handles.clear();
        self.fields = Descriptor::empty();
        self.parameters = Descriptor::empty();
        self.columns = None;
        self.statement_type = StatementType::Unknown(0);
        self.transition(StatementState::Deallocated);
        self.handle = 0;
        result
    }

    /// Execution plan text, or `None` when the server has none or it did
    /// not fit the largest buffer tried.
    pub async fn execution_plan<T: Transport>(
        &mut self,
        db: &mut Database<T>,
    ) -> Result<Option<String>> {
        if matches!(
            self.state,
            StatementState::Deallocated | StatementState::Allocated
        ) {
            return Err(self.invalid("read the plan of"));
        }

        let mut buffer_size = MAX_BUFFER_SIZE;
        for attempt in 0..=PLAN_MAX_RETRIES {
            let response = db
                .execute(&InfoSqlMessage {
                    stmt_handle: self.handle,
                    items: PLAN_ITEMS,
                    buffer_size,
                })
                .await?;
            match parse_plan(&response.data, db.charsets().default_charset())? {
                PlanInfo::Plan(plan) => return Ok(Some(plan)),
                PlanInfo::Empty => return Ok(None),
                PlanInfo::Truncated => {
                    tracing::debug!(handle = self.handle, attempt, buffer_size, "plan truncated");
                    buffer_size = buffer_size.saturating_mul(2);
                }
            }
        }
        Ok(None)
    }

    /// Rows inserted, updated or deleted by the last execution, or -1 for
    /// statement types the server does not count.
    pub async fn records_affected<T: Transport>(&mut self, db: &mut Database<T>) -> Result<i64> {
        if !self.statement_type.has_record_counts()
            || matches!(
                self.state,
                StatementState::Deallocated | StatementState::Allocated
            )
        {
            return Ok(-1);
        }
        let response = db
            .execute(&InfoSqlMessage {
                stmt_handle: self.handle,
                items: RECORDS_ITEMS,
                buffer_size: MAX_BUFFER_SIZE,
            })
            .await?;
        Ok(parse_record_counts(&response.data)?.affected())
    }

    /// Create an empty blob in the statement's transaction.
    pub async fn create_blob<T: Transport>(&mut self, db: &mut Database<T>) -> Result<Blob> {
        let blob = Blob::create(db, self.tx_handle()?).await?;
        self.created_handles.push(blob.id());
        Ok(blob)
    }

    /// Store `data` as a new blob and return its id.
    pub async fn write_blob<T: Transport>(
        &mut self,
        db: &mut Database<T>,
        data: &[u8],
    ) -> Result<i64> {
        let id = blob::write_blob(db, self.tx_handle()?, data).await?;
        self.created_handles.push(id);
        Ok(id)
    }

    /// Look up an array column in the statement's transaction.
    pub async fn create_array<T: Transport>(
        &mut self,
        db: &mut Database<T>,
        table: &str,
        column: &str,
    ) -> Result<ArrayColumn> {
        let binding = self.transaction.clone().ok_or(Error::NoTransaction)?;
        ArrayColumn::lookup(db, &binding, table, column).await
    }

    /// Store `value` in `column` and return the new array id.
    pub async fn write_array<T: Transport>(
        &mut self,
        db: &mut Database<T>,
        column: &ArrayColumn,
        value: &ArrayValue,
    ) -> Result<i64> {
        let id = column.write(db, self.tx_handle()?, value).await?;
        self.created_handles.push(id);
        Ok(id)
    }
}

fn describe_progress(info: &DescribeInfo) -> (usize, bool, usize, bool) {
    (
        info.select.complete,
        info.select.descriptor.is_some(),
        info.bind.complete,
        info.bind.descriptor.is_some(),
    )
}

/// Resolves blob and array handles of fetched rows.
struct StatementResolver<'a, T: Transport> {
    db: &'a mut Database<T>,
    transaction: &'a TransactionBinding,
}

impl<T: Transport> ValueResolver for StatementResolver<'_, T> {
    async fn read_blob(&mut self, field: &Field, blob_id: i64) -> Result<DbValue> {
        let data = blob::read_blob(self.db, self.transaction.handle(), blob_id).await?;
        if field.db_data_type()? == DbDataType::Text {
            Ok(DbValue::String(field.charset().decode(&data)?))
        } else {
            Ok(DbValue::Binary(data))
        }
    }

    async fn lookup_array(&mut self, relation: &str, column: &str) -> Result<ArrayDesc> {
        ArrayColumn::lookup_descriptor(self.db, self.transaction, relation, column).await
    }

    async fn read_array(&mut self, desc: &ArrayDesc, array_id: i64) -> Result<ArrayValue> {
        array::read_array(self.db, self.transaction.handle(), desc, array_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_statement_is_deallocated() {
        let statement = Statement::new(0);
        assert_eq!(statement.state(), StatementState::Deallocated);
        assert_eq!(statement.statement_type(), StatementType::Unknown(0));
        assert_eq!(statement.fetch_size, 1);
        assert!(statement.transaction_handle().is_none());
    }

    #[test]
    fn test_set_parameter_bounds() {
        let mut statement = Statement::new(10);
        assert!(matches!(
            statement.set_parameter(0, 1i32),
            Err(Error::ColumnIndexOutOfBounds { index: 0, count: 0 })
        ));
    }

    #[test]
    fn test_closable_types() {
        assert!(StatementType::Select.is_closable());
        assert!(StatementType::StoredProcedure.is_closable());
        assert!(!StatementType::Insert.is_closable());
        assert!(!StatementType::Ddl.is_cursor());
        assert!(!StatementType::Select.has_record_counts());
        assert!(StatementType::Delete.has_record_counts());
    }
}
