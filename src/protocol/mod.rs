//! Firebird remote protocol implementation for the thin client.

pub mod buffer;
pub mod charset;
pub mod codec;
pub mod constants;
pub mod info;
pub mod message;
pub mod messages;
pub mod param_buffer;
pub mod response;
pub mod status;
pub mod transport;
pub mod types;

pub use buffer::ReadBuffer;
pub use charset::{Charset, CharsetContext, CharsetRegistry};
pub use message::{Message, WriteExt};
pub use param_buffer::{
    BlobParameterBuffer, DatabaseParameterBuffer, EventParameterBuffer, ParameterBuffer,
    ServiceParameterBuffer, TransactionParameterBuffer,
};
pub use status::{ErrorCell, IscError};
pub use transport::Transport;
pub use types::{Column, ColumnInfo, DbDataType, DbValue, Descriptor, Field, Row};
