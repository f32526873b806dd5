//! Row cursors over executed select statements.
//!
//! `RowCursor` borrows the attachment and the statement for its lifetime
//! and pulls rows through `Statement::fetch`, which refills its buffer with
//! one op_fetch per `fetch_size` rows.

use futures::Stream;
use std::future::Future;

use crate::database::Database;
use crate::error::Result;
use crate::protocol::transport::Transport;
use crate::protocol::types::{Column, Row};
use crate::statement::{Statement, StatementState};
use crate::transaction::Transaction;

/// Async iteration over the results of a statement.
///
/// Implementations borrow the attachment mutably, so an attachment serves
/// one open cursor at a time.
pub trait Cursor {
    /// Yielded item.
    type Item;

    /// Output columns; empty before prepare.
    fn columns(&self) -> &[Column];

    /// Rows handed out so far.
    fn rowcount(&self) -> u64;

    /// Check if the cursor is closed.
    fn is_closed(&self) -> bool;

    /// Check if more items may be available.
    fn has_more(&self) -> bool;

    /// Rows requested per fetch round trip.
    fn fetch_size(&self) -> u32;

    /// Change the batch size for the next op_fetch.
    fn set_fetch_size(&mut self, size: u32);

    /// Close the server-side cursor (DSQL_close). The statement stays
    /// prepared.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Next item, or `Ok(None)` at end of cursor.
    fn next(&mut self) -> impl Future<Output = Result<Option<Self::Item>>> + Send;

    /// Drain the cursor into a vector and close it.
    fn fetch_all(&mut self) -> impl Future<Output = Result<Vec<Self::Item>>> + Send;
}

/// Row-by-row cursor over an executed select statement.
///
/// # Lifecycle
///
/// 1. Created by `RowCursor::open()` or over an executed statement
/// 2. Drained with `next()`, `fetch_all()` or `into_stream()`
/// 3. Closed when exhausted or explicitly via `close()`
pub struct RowCursor<'a, T: Transport> {
    db: &'a mut Database<T>,
    statement: &'a mut Statement,
    rows_fetched: u64,
    exhausted: bool,
}

impl<'a, T: Transport> RowCursor<'a, T> {
    /// Wrap an executed statement.
    pub fn new(db: &'a mut Database<T>, statement: &'a mut Statement) -> Self {
        Self {
            db,
            statement,
            rows_fetched: 0,
            exhausted: false,
        }
    }

    /// Prepare and execute `sql`, returning a cursor over its rows.
    pub async fn open(
        db: &'a mut Database<T>,
        statement: &'a mut Statement,
        transaction: &Transaction,
        sql: &str,
    ) -> Result<Self> {
        statement.prepare(db, transaction, sql).await?;
        statement.execute(db).await?;
        Ok(Self::new(db, statement))
    }

    /// Get column labels.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns().iter().map(Column::label).collect()
    }

    /// Column count.
    pub fn num_columns(&self) -> usize {
        self.columns().len()
    }

    /// Underlying statement.
    pub fn statement(&self) -> &Statement {
        self.statement
    }
}

impl<T: Transport> Cursor for RowCursor<'_, T> {
    type Item = Row;

    fn columns(&self) -> &[Column] {
        self.statement
            .columns()
            .map(|info| info.columns.as_slice())
            .unwrap_or(&[])
    }

    fn rowcount(&self) -> u64 {
        self.rows_fetched
    }

    fn is_closed(&self) -> bool {
        self.statement.state() != StatementState::Executed
    }

    fn has_more(&self) -> bool {
        !self.exhausted && !self.is_closed()
    }

    fn fetch_size(&self) -> u32 {
        self.statement.fetch_size()
    }

    fn set_fetch_size(&mut self, size: u32) {
        self.statement.set_fetch_size(size);
    }

    async fn close(&mut self) -> Result<()> {
        self.exhausted = true;
        self.statement.close(self.db).await
    }

    async fn next(&mut self) -> Result<Option<Self::Item>> {
        if !self.has_more() {
            return Ok(None);
        }
        match self.statement.fetch(self.db).await? {
            Some(row) => {
                self.rows_fetched += 1;
                Ok(Some(row))
            }
            None => {
                self.close().await?;
                Ok(None)
            }
        }
    }

    async fn fetch_all(&mut self) -> Result<Vec<Self::Item>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        if !self.is_closed() {
            self.close().await?;
        }
        Ok(rows)
    }
}

/// Adapts a cursor into a `futures::Stream`.
///
/// # Example
///
/// ```no_run
/// use firebird_thin_rs::{Cursor, CursorStreamExt, Row};
/// use futures::stream::TryStreamExt;
///
/// async fn names<C: Cursor<Item = Row> + Unpin>(cursor: C) -> firebird_thin_rs::Result<Vec<String>> {
///     cursor
///         .into_stream()
///         .map_ok(|row| row.get(0).map(|v| v.to_string()).unwrap_or_default())
///         .try_collect()
///         .await
/// }
/// ```
pub trait CursorStreamExt: Cursor + Sized {
    /// Consume the cursor. The stream ends after the first error.
    fn into_stream(self) -> impl Stream<Item = Result<Self::Item>>;
}

impl<C: Cursor + Unpin> CursorStreamExt for C {
    fn into_stream(self) -> impl Stream<Item = Result<Self::Item>> {
        use futures::stream;

        stream::unfold(Some(self), |state| async move {
            let mut cursor = state?;
            match cursor.next().await {
                Ok(Some(item)) => Some((Ok(item), Some(cursor))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
