//! Request message definitions.
//!
//! Each message implements the `Message` trait for single-allocation
//! serialization.

pub mod blob;
pub mod database;
pub mod slice;
pub mod statement;

pub use blob::{GetSegmentMessage, OpenBlobMessage, PutSegmentMessage};
pub use database::{
    AttachMessage, CancelEventsMessage, HandleMessage, QueueEventsMessage, TransactionMessage,
};
pub use slice::{GetSliceMessage, PutSliceMessage};
pub use statement::{
    ExecuteMessage, FetchMessage, FreeStatementMessage, InfoSqlMessage, PrepareMessage,
};
