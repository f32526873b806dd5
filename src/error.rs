//! Error types for the Firebird thin client.

use std::io;
use std::panic::Location;
use thiserror::Error;

use crate::protocol::status::IscError;
use crate::statement::StatementState;

/// Result type alias for Firebird operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Firebird thin client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error reported by the transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Protocol error.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Unexpected operation code in a server response.
    #[error("Unexpected operation: expected {expected}, got {actual}")]
    UnexpectedOperation { expected: u32, actual: u32 },

    /// Error or warning returned by the server in a status vector.
    #[error(transparent)]
    Isc(#[from] IscError),

    /// Type conversion error.
    #[error("Type conversion error: {message}")]
    TypeConversion { message: String },

    /// Column not found.
    #[error("Column not found: {name}")]
    ColumnNotFound { name: String },

    /// Column index out of bounds.
    #[error("Column index {index} out of bounds (columns: {count})")]
    ColumnIndexOutOfBounds { index: usize, count: usize },

    /// Null value error.
    #[error("Unexpected NULL value in column {column}")]
    NullValue { column: String },

    /// Buffer too small.
    #[error("Buffer too small: need {needed} bytes, have {available} filed at {location}")]
    BufferTooSmall {
        needed: usize,
        available: usize,
        location: &'static Location<'static>,
    },

    /// Invalid connection string.
    #[error("Invalid connection string: {message}")]
    InvalidConnectString { message: String },

    /// Charset or encoding misconfiguration.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unsupported wire data type.
    #[error("Unsupported data type: {type_num}")]
    UnsupportedType { type_num: i32 },

    /// Operation not legal in the statement's current state.
    #[error("Cannot {operation} a statement in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: StatementState,
    },

    /// The statement has no transaction bound to it.
    #[error("Statement has no active transaction")]
    NoTransaction,

    /// Array column metadata is missing from the catalog.
    #[error("Array metadata not found for {table}.{column}")]
    ArrayMetadataNotFound { table: String, column: String },

    /// Array rank outside 1..=16 or not matching the column.
    #[error("Invalid array dimensions: expected {expected}, got {actual}")]
    InvalidDimensions { expected: usize, actual: usize },
}

impl Error {
    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a type conversion error.
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Server error code, when this error came from a status vector.
    pub fn isc_code(&self) -> Option<i32> {
        match self {
            Error::Isc(err) => Some(err.error_code()),
            _ => None,
        }
    }
}
