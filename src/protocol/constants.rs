//! Firebird remote protocol constants.
//!
//! Values follow the Firebird `ibase.h` / remote protocol headers.

// Operation codes
pub const OP_VOID: u32 = 0;
pub const OP_RESPONSE: u32 = 9;
pub const OP_ATTACH: u32 = 19;
pub const OP_DETACH: u32 = 21;
pub const OP_TRANSACTION: u32 = 29;
pub const OP_COMMIT: u32 = 30;
pub const OP_ROLLBACK: u32 = 31;
pub const OP_GET_SEGMENT: u32 = 36;
pub const OP_PUT_SEGMENT: u32 = 37;
pub const OP_CANCEL_BLOB: u32 = 38;
pub const OP_CLOSE_BLOB: u32 = 39;
pub const OP_QUE_EVENTS: u32 = 48;
pub const OP_CANCEL_EVENTS: u32 = 49;
pub const OP_COMMIT_RETAINING: u32 = 50;
pub const OP_EVENT: u32 = 52;
pub const OP_OPEN_BLOB2: u32 = 56;
pub const OP_CREATE_BLOB2: u32 = 57;
pub const OP_GET_SLICE: u32 = 58;
pub const OP_PUT_SLICE: u32 = 59;
pub const OP_SLICE: u32 = 60;
pub const OP_ALLOCATE_STATEMENT: u32 = 62;
pub const OP_EXECUTE: u32 = 63;
pub const OP_FETCH: u32 = 65;
pub const OP_FETCH_RESPONSE: u32 = 66;
pub const OP_FREE_STATEMENT: u32 = 67;
pub const OP_PREPARE_STATEMENT: u32 = 68;
pub const OP_INFO_SQL: u32 = 70;
pub const OP_EXECUTE2: u32 = 76;
pub const OP_SQL_RESPONSE: u32 = 78;

// Free statement options
pub const DSQL_CLOSE: i32 = 1;
pub const DSQL_DROP: i32 = 2;

// Fetch status
pub const FETCH_OK: i32 = 0;
pub const FETCH_NO_MORE_ROWS: i32 = 100;

// SQL data types (XSQLVAR sqltype, low bit is the nullable flag)
pub const SQL_VARYING: i32 = 448;
pub const SQL_TEXT: i32 = 452;
pub const SQL_DOUBLE: i32 = 480;
pub const SQL_FLOAT: i32 = 482;
pub const SQL_LONG: i32 = 496;
pub const SQL_SHORT: i32 = 500;
pub const SQL_TIMESTAMP: i32 = 510;
pub const SQL_BLOB: i32 = 520;
pub const SQL_D_FLOAT: i32 = 530;
pub const SQL_ARRAY: i32 = 540;
pub const SQL_QUAD: i32 = 550;
pub const SQL_TYPE_TIME: i32 = 560;
pub const SQL_TYPE_DATE: i32 = 570;
pub const SQL_INT64: i32 = 580;

// BLR
pub const BLR_VERSION5: u8 = 5;
pub const BLR_BEGIN: u8 = 2;
pub const BLR_MESSAGE: u8 = 4;
pub const BLR_END: u8 = 255;
pub const BLR_EOC: u8 = 76;

pub const BLR_SHORT: u8 = 7;
pub const BLR_LONG: u8 = 8;
pub const BLR_QUAD: u8 = 9;
pub const BLR_FLOAT: u8 = 10;
pub const BLR_D_FLOAT: u8 = 11;
pub const BLR_SQL_DATE: u8 = 12;
pub const BLR_SQL_TIME: u8 = 13;
pub const BLR_TEXT: u8 = 14;
pub const BLR_TEXT2: u8 = 15;
pub const BLR_INT64: u8 = 16;
pub const BLR_DOUBLE: u8 = 27;
pub const BLR_TIMESTAMP: u8 = 35;
pub const BLR_VARYING: u8 = 37;
pub const BLR_VARYING2: u8 = 38;
pub const BLR_CSTRING: u8 = 40;
pub const BLR_CSTRING2: u8 = 41;

// SDL
pub const ISC_SDL_VERSION1: u8 = 1;
pub const ISC_SDL_EOC: u8 = 255;
pub const ISC_SDL_RELATION: u8 = 2;
pub const ISC_SDL_FIELD: u8 = 4;
pub const ISC_SDL_STRUCT: u8 = 6;
pub const ISC_SDL_VARIABLE: u8 = 7;
pub const ISC_SDL_SCALAR: u8 = 8;
pub const ISC_SDL_TINY_INTEGER: u8 = 9;
pub const ISC_SDL_SHORT_INTEGER: u8 = 10;
pub const ISC_SDL_LONG_INTEGER: u8 = 11;
pub const ISC_SDL_DO2: u8 = 34;
pub const ISC_SDL_DO1: u8 = 35;
pub const ISC_SDL_ELEMENT: u8 = 36;

pub const ARRAY_DESC_COLUMN_MAJOR: i16 = 1;
pub const ARRAY_MAX_DIMENSIONS: usize = 16;

// Info items
pub const ISC_INFO_END: u8 = 1;
pub const ISC_INFO_TRUNCATED: u8 = 2;
pub const ISC_INFO_ERROR: u8 = 3;

pub const ISC_INFO_SQL_SELECT: u8 = 4;
pub const ISC_INFO_SQL_BIND: u8 = 5;
pub const ISC_INFO_SQL_NUM_VARIABLES: u8 = 6;
pub const ISC_INFO_SQL_DESCRIBE_VARS: u8 = 7;
pub const ISC_INFO_SQL_DESCRIBE_END: u8 = 8;
pub const ISC_INFO_SQL_SQLDA_SEQ: u8 = 9;
pub const ISC_INFO_SQL_MESSAGE_SEQ: u8 = 10;
pub const ISC_INFO_SQL_TYPE: u8 = 11;
pub const ISC_INFO_SQL_SUB_TYPE: u8 = 12;
pub const ISC_INFO_SQL_SCALE: u8 = 13;
pub const ISC_INFO_SQL_LENGTH: u8 = 14;
pub const ISC_INFO_SQL_NULL_IND: u8 = 15;
pub const ISC_INFO_SQL_FIELD: u8 = 16;
pub const ISC_INFO_SQL_RELATION: u8 = 17;
pub const ISC_INFO_SQL_OWNER: u8 = 18;
pub const ISC_INFO_SQL_ALIAS: u8 = 19;
pub const ISC_INFO_SQL_SQLDA_START: u8 = 20;
pub const ISC_INFO_SQL_STMT_TYPE: u8 = 21;
pub const ISC_INFO_SQL_GET_PLAN: u8 = 22;
pub const ISC_INFO_SQL_RECORDS: u8 = 23;

pub const ISC_INFO_REQ_SELECT_COUNT: u8 = 13;
pub const ISC_INFO_REQ_INSERT_COUNT: u8 = 14;
pub const ISC_INFO_REQ_UPDATE_COUNT: u8 = 15;
pub const ISC_INFO_REQ_DELETE_COUNT: u8 = 16;

// Statement types (isc_info_sql_stmt_*)
pub const ISC_INFO_SQL_STMT_SELECT: i32 = 1;
pub const ISC_INFO_SQL_STMT_INSERT: i32 = 2;
pub const ISC_INFO_SQL_STMT_UPDATE: i32 = 3;
pub const ISC_INFO_SQL_STMT_DELETE: i32 = 4;
pub const ISC_INFO_SQL_STMT_DDL: i32 = 5;
pub const ISC_INFO_SQL_STMT_GET_SEGMENT: i32 = 6;
pub const ISC_INFO_SQL_STMT_PUT_SEGMENT: i32 = 7;
pub const ISC_INFO_SQL_STMT_EXEC_PROCEDURE: i32 = 8;
pub const ISC_INFO_SQL_STMT_START_TRANS: i32 = 9;
pub const ISC_INFO_SQL_STMT_COMMIT: i32 = 10;
pub const ISC_INFO_SQL_STMT_ROLLBACK: i32 = 11;
pub const ISC_INFO_SQL_STMT_SELECT_FOR_UPD: i32 = 12;
pub const ISC_INFO_SQL_STMT_SET_GENERATOR: i32 = 13;
pub const ISC_INFO_SQL_STMT_SAVEPOINT: i32 = 14;

/// Largest info buffer requested in a single round trip.
pub const MAX_BUFFER_SIZE: u32 = 32767;
/// Number of times the plan request doubles its buffer before giving up.
pub const PLAN_MAX_RETRIES: u32 = 4;

// Blob segment status (op_get_segment response object handle)
pub const BLOB_SEGMENT_COMPLETE: i32 = 0;
pub const BLOB_SEGMENT_PARTIAL: i32 = 1;
pub const BLOB_SEGMENT_EOF: i32 = 2;

// Blob runtime flags
pub const RBL_EOF: u32 = 1;
pub const RBL_SEGMENT: u32 = 2;
pub const RBL_EOF_PENDING: u32 = 4;
pub const RBL_CREATE: u32 = 8;

/// Upper bound of a single op_get_segment request.
pub const MAX_SEGMENT_REQUEST: u32 = 32767;

// Status vector argument types
pub const ISC_ARG_END: i32 = 0;
pub const ISC_ARG_GDS: i32 = 1;
pub const ISC_ARG_STRING: i32 = 2;
pub const ISC_ARG_CSTRING: i32 = 3;
pub const ISC_ARG_NUMBER: i32 = 4;
pub const ISC_ARG_INTERPRETED: i32 = 5;
pub const ISC_ARG_WARNING: i32 = 18;
pub const ISC_ARG_SQL_STATE: i32 = 19;

// Parameter buffer versions and tags
pub const ISC_DPB_VERSION1: u8 = 1;
pub const ISC_DPB_PAGE_BUFFERS: u8 = 5;
pub const ISC_DPB_DUMMY_PACKET_INTERVAL: u8 = 58;
pub const ISC_DPB_SQL_ROLE_NAME: u8 = 60;
pub const ISC_DPB_SQL_DIALECT: u8 = 63;
pub const ISC_DPB_LC_CTYPE: u8 = 48;
pub const ISC_DPB_USER_NAME: u8 = 28;
pub const ISC_DPB_PASSWORD: u8 = 29;

pub const ISC_TPB_VERSION3: u8 = 3;
pub const ISC_TPB_CONSISTENCY: u8 = 1;
pub const ISC_TPB_CONCURRENCY: u8 = 2;
pub const ISC_TPB_WAIT: u8 = 6;
pub const ISC_TPB_NOWAIT: u8 = 7;
pub const ISC_TPB_READ: u8 = 8;
pub const ISC_TPB_WRITE: u8 = 9;
pub const ISC_TPB_LOCK_READ: u8 = 10;
pub const ISC_TPB_LOCK_WRITE: u8 = 11;
pub const ISC_TPB_READ_COMMITTED: u8 = 15;
pub const ISC_TPB_REC_VERSION: u8 = 17;
pub const ISC_TPB_NO_REC_VERSION: u8 = 18;

pub const ISC_BPB_VERSION1: u8 = 1;
pub const ISC_BPB_SOURCE_TYPE: u8 = 1;
pub const ISC_BPB_TARGET_TYPE: u8 = 2;
pub const ISC_BPB_TYPE: u8 = 3;
pub const ISC_BPB_SOURCE_INTERP: u8 = 4;
pub const ISC_BPB_TARGET_INTERP: u8 = 5;

pub const EPB_VERSION1: u8 = 1;

pub const ISC_SPB_VERSION2: u8 = 2;
pub const ISC_SPB_CURRENT_VERSION: u8 = 2;
pub const ISC_SPB_USER_NAME: u8 = 28;
pub const ISC_SPB_PASSWORD: u8 = 29;

// Charset ids
pub const CS_NONE: u8 = 0;
pub const CS_OCTETS: u8 = 1;
pub const CS_DYNAMIC: u8 = 127;

// Selected GDS codes
pub const ISC_ARITH_EXCEPT: i32 = 335544321;
pub const ISC_RANDOM: i32 = 335544382;
pub const ISC_EXCEPT: i32 = 335544517;
pub const ISC_INVALID_DIMENSION: i32 = 335544458;
