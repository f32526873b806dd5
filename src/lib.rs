//! Firebird Thin Client for Rust
//!
//! The client-side data-marshalling core of the Firebird remote protocol:
//! parameter buffers, the XDR type codec, row descriptors with BLR, the
//! statement state machine, blob and array I/O, and status-vector
//! diagnostics. Bytes move through a caller-supplied [`Transport`].
//!
//! # Example
//!
//! ```no_run
//! use firebird_thin_rs::{
//!     Cursor, Database, DatabaseParams, Result, RowCursor, Statement, Transaction,
//!     TransactionParameterBuffer, Transport,
//! };
//!
//! async fn list_tables<T: Transport>(transport: T) -> Result<Vec<String>> {
//!     let params = DatabaseParams::parse(
//!         "database=localhost:employee;user=SYSDBA;password=masterkey",
//!     )?;
//!     let mut db = Database::attach(transport, params).await?;
//!     let mut tx = Transaction::begin(&mut db, &TransactionParameterBuffer::read_committed()).await?;
//!
//!     let mut stmt = Statement::for_database(&db);
//!     stmt.allocate(&mut db).await?;
//!     let rows = RowCursor::open(
//!         &mut db,
//!         &mut stmt,
//!         &tx,
//!         "SELECT RDB$RELATION_NAME FROM RDB$RELATIONS",
//!     )
//!     .await?
//!     .fetch_all()
//!     .await?;
//!
//!     stmt.release(&mut db).await?;
//!     tx.commit(&mut db).await?;
//!     db.detach().await?;
//!     Ok(rows
//!         .iter()
//!         .filter_map(|row| row.get(0).and_then(|v| v.as_str()))
//!         .map(|name| name.trim_end().to_string())
//!         .collect())
//! }
//! ```

pub mod array;
pub mod blob;
pub mod cursor;
pub mod database;
pub mod error;
pub mod events;
pub mod protocol;
pub mod statement;
pub mod transaction;

// Re-export main types
pub use array::ArrayColumn;
pub use blob::Blob;
pub use cursor::{Cursor, CursorStreamExt, RowCursor};
pub use database::{Database, DatabaseParams};
pub use error::{Error, Result};
pub use events::{EventNotification, RemoteEvent};
pub use protocol::param_buffer::{
    BlobParameterBuffer, DatabaseParameterBuffer, EventParameterBuffer,
    ServiceParameterBuffer, TransactionParameterBuffer,
};
pub use protocol::status::{ErrorCell, IscError};
pub use protocol::transport::Transport;
pub use protocol::types::{
    ArrayBound, ArrayDesc, ArrayValue, Column, ColumnInfo, DbDataType, DbValue, Descriptor,
    Field, Row,
};
pub use statement::{Statement, StatementState, StatementType};
pub use transaction::{Transaction, TransactionBinding, TransactionState};
