//! Scaled integer codec for NUMERIC / DECIMAL columns.
//!
//! Exact numerics travel as SHORT, LONG or INT64 integers with a negative
//! scale: the column value is `raw * 10^scale`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::protocol::constants::{SQL_LONG, SQL_SHORT};

/// Largest scale `rust_decimal` can represent.
const MAX_DECIMAL_SCALE: u32 = 28;

/// Decode a raw wire integer with the given scale.
///
/// A negative scale divides by `10^-scale` exactly; a non-negative scale is
/// passed through unchanged.
pub fn decode_scaled_integer(raw: i64, scale: i32) -> Result<Decimal> {
    if scale >= 0 {
        return Ok(Decimal::from(raw));
    }
    let digits = scale.unsigned_abs();
    if digits > MAX_DECIMAL_SCALE {
        return Err(Error::type_conversion(format!(
            "Scale {} exceeds supported precision",
            scale
        )));
    }
    Ok(Decimal::new(raw, digits))
}

/// Encode a decimal value as the raw wire integer for `sql_type`.
///
/// Multiplies by `10^-scale`, truncates any remaining fraction and checks
/// the result fits the 16, 32 or 64 bit width implied by the type.
pub fn encode_scaled_decimal(value: Decimal, scale: i32, sql_type: i32) -> Result<i64> {
    let scaled = if scale < 0 {
        let digits = scale.unsigned_abs();
        if digits > MAX_DECIMAL_SCALE {
            return Err(overflow(value, sql_type));
        }
        let factor = Decimal::from_i128_with_scale(10i128.pow(digits), 0);
        value.checked_mul(factor).ok_or_else(|| overflow(value, sql_type))?
    } else {
        value
    };

    let raw = scaled
        .trunc()
        .to_i64()
        .ok_or_else(|| overflow(value, sql_type))?;

    let fits = match sql_type {
        SQL_SHORT => i16::try_from(raw).is_ok(),
        SQL_LONG => i32::try_from(raw).is_ok(),
        _ => true,
    };
    if !fits {
        return Err(overflow(value, sql_type));
    }
    Ok(raw)
}

/// Encode a double into a scaled wire integer.
pub fn encode_scaled_f64(value: f64, scale: i32, sql_type: i32) -> Result<i64> {
    let decimal = Decimal::try_from(value).map_err(|_| {
        Error::type_conversion(format!("Value {} cannot be stored as a decimal", value))
    })?;
    encode_scaled_decimal(decimal, scale, sql_type)
}

fn overflow(value: Decimal, sql_type: i32) -> Error {
    Error::type_conversion(format!(
        "Value {} does not fit SQL type {}",
        value, sql_type
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::SQL_INT64;
    use std::str::FromStr;

    #[test]
    fn test_decode_negative_scale() {
        assert_eq!(
            decode_scaled_integer(12345, -2).unwrap(),
            Decimal::from_str("123.45").unwrap()
        );
        assert_eq!(
            decode_scaled_integer(-5, -3).unwrap(),
            Decimal::from_str("-0.005").unwrap()
        );
    }

    #[test]
    fn test_decode_non_negative_scale_passes_through() {
        assert_eq!(decode_scaled_integer(42, 0).unwrap(), Decimal::from(42));
        assert_eq!(decode_scaled_integer(42, 3).unwrap(), Decimal::from(42));
    }

    #[test]
    fn test_encode_truncates_fraction() {
        let value = Decimal::from_str("1.239").unwrap();
        assert_eq!(encode_scaled_decimal(value, -2, SQL_LONG).unwrap(), 123);
        let value = Decimal::from_str("-1.239").unwrap();
        assert_eq!(encode_scaled_decimal(value, -2, SQL_LONG).unwrap(), -123);
    }

    #[test]
    fn test_scaling_inverse() {
        let cases: &[(i64, i32, i32)] = &[
            (i16::MAX as i64, -4, SQL_SHORT),
            (i16::MIN as i64, -1, SQL_SHORT),
            (i32::MAX as i64, -9, SQL_LONG),
            (-987654321, -3, SQL_LONG),
            (i64::MAX, -18, SQL_INT64),
            (i64::MIN, -18, SQL_INT64),
            (0, -2, SQL_INT64),
        ];
        for &(raw, scale, sql_type) in cases {
            let decoded = decode_scaled_integer(raw, scale).unwrap();
            assert_eq!(
                encode_scaled_decimal(decoded, scale, sql_type).unwrap(),
                raw,
                "inverse failed for raw={} scale={}",
                raw,
                scale
            );
        }
    }

    #[test]
    fn test_encode_overflow_by_width() {
        let value = Decimal::from(40_000);
        assert!(matches!(
            encode_scaled_decimal(value, 0, SQL_SHORT),
            Err(Error::TypeConversion { .. })
        ));
        assert_eq!(encode_scaled_decimal(value, 0, SQL_LONG).unwrap(), 40_000);
        let value = Decimal::from(1_000_000);
        assert!(encode_scaled_decimal(value, -4, SQL_LONG).is_err());
    }

    #[test]
    fn test_encode_f64() {
        assert_eq!(encode_scaled_f64(12.5, -2, SQL_LONG).unwrap(), 1250);
    }
}
