//! Firebird value codecs.
//!
//! This module contains the conversions between wire representations and
//! host values: calendar types, scaled integers and XDR rows.

pub mod date;
pub mod number;
pub mod value;

pub use date::{
    decode_date, decode_time, decode_timestamp, encode_date, encode_time, encode_timestamp,
};
pub use number::{decode_scaled_integer, encode_scaled_decimal};
pub use value::{read_field_value, read_row, write_field_value, write_row};
