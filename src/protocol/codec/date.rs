//! Firebird DATE / TIME / TIMESTAMP codec.
//!
//! A DATE is the number of days since 1858-11-17 (the Modified Julian Day
//! epoch). A TIME is the number of 100 microsecond ticks since midnight.
//! A TIMESTAMP is a (DATE, TIME) pair. Conversion uses the classic
//! Julian day number decomposition in plain integer arithmetic.

use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Ticks per second in a wire TIME value.
pub const TIME_TICKS_PER_SECOND: i64 = 10_000;

/// Nanoseconds per wire TIME tick.
const NANOS_PER_TICK: u32 = 100_000;

/// Offset between the Julian day number of 0000-03-01 and the wire epoch.
const JULIAN_OFFSET: i64 = 1_721_119 - 2_400_001;

/// Offset added to a wire date before decomposing it into century/days.
const DECODE_OFFSET: i64 = 678_882;

/// Encode a calendar date as days since 1858-11-17.
pub fn encode_date(date: NaiveDate) -> i32 {
    let mut year = date.year() as i64;
    let mut month = date.month() as i64;
    let day = date.day() as i64;

    if month > 2 {
        month -= 3;
    } else {
        month += 9;
        year -= 1;
    }

    let century = year / 100;
    let year_of_century = year - 100 * century;

    ((146_097 * century) / 4
        + (1_461 * year_of_century) / 4
        + (153 * month + 2) / 5
        + day
        + JULIAN_OFFSET) as i32
}

/// Decode days since 1858-11-17 into a calendar date.
///
/// # Errors
/// Returns `Error::TypeConversion` when the value falls outside the range
/// representable by `NaiveDate`.
pub fn decode_date(value: i32) -> Result<NaiveDate> {
    let mut nday = value as i64 + DECODE_OFFSET;

    let century = (4 * nday - 1) / 146_097;
    nday = 4 * nday - 1 - 146_097 * century;
    let mut day = nday / 4;

    nday = (4 * day + 3) / 1_461;
    day = 4 * day + 3 - 1_461 * nday;
    day = (day + 4) / 4;

    let mut month = (5 * day - 3) / 153;
    day = 5 * day - 3 - 153 * month;
    day = (day + 5) / 5;

    let mut year = 100 * century + nday;

    if month < 10 {
        month += 3;
    } else {
        month -= 9;
        year += 1;
    }

    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32).ok_or_else(|| {
        Error::type_conversion(format!(
            "Date value {} is out of range (year={}, month={}, day={})",
            value, year, month, day
        ))
    })
}

/// Encode a time of day as 100 microsecond ticks since midnight.
///
/// Sub-tick precision is truncated.
pub fn encode_time(time: NaiveTime) -> i32 {
    let seconds = time.num_seconds_from_midnight() as i64;
    // Leap-second representation carries nanos >= 1e9
    let nanos = time.nanosecond().min(999_999_999);
    (seconds * TIME_TICKS_PER_SECOND + (nanos / NANOS_PER_TICK) as i64) as i32
}

/// Decode 100 microsecond ticks since midnight.
pub fn decode_time(value: i32) -> Result<NaiveTime> {
    if value < 0 {
        return Err(Error::type_conversion(format!(
            "Negative time value: {}",
            value
        )));
    }
    let ticks = value as i64;
    let seconds = (ticks / TIME_TICKS_PER_SECOND) as u32;
    let nanos = (ticks % TIME_TICKS_PER_SECOND) as u32 * NANOS_PER_TICK;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, nanos)
        .ok_or_else(|| Error::type_conversion(format!("Time value {} is out of range", value)))
}

/// Encode a timestamp as its (date, time) wire pair.
pub fn encode_timestamp(value: NaiveDateTime) -> (i32, i32) {
    (encode_date(value.date()), encode_time(value.time()))
}

/// Decode a (date, time) wire pair.
pub fn decode_timestamp(date: i32, time: i32) -> Result<NaiveDateTime> {
    Ok(NaiveDateTime::new(decode_date(date)?, decode_time(time)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_epoch_is_zero() {
        assert_eq!(encode_date(ymd(1858, 11, 17)), 0);
        assert_eq!(decode_date(0).unwrap(), ymd(1858, 11, 17));
    }

    #[test]
    fn test_known_dates() {
        // 2000-01-01 is MJD 51544
        assert_eq!(encode_date(ymd(2000, 1, 1)), 51_544);
        assert_eq!(decode_date(51_544).unwrap(), ymd(2000, 1, 1));
        assert_eq!(encode_date(ymd(1858, 11, 16)), -1);
        assert_eq!(decode_date(-678_575).unwrap(), ymd(1, 1, 1));
    }

    #[test]
    fn test_date_round_trip_full_range() {
        let mut date = ymd(1, 1, 1);
        let end = ymd(9999, 12, 31);
        // Every 7th day keeps the loop short while covering all month/leap shapes.
        while date <= end {
            let encoded = encode_date(date);
            assert_eq!(decode_date(encoded).unwrap(), date, "round trip {}", date);
            date += chrono::Duration::days(7);
        }
        assert_eq!(decode_date(encode_date(end)).unwrap(), end);
    }

    #[test]
    fn test_leap_days_round_trip() {
        for year in [1600, 1900, 2000, 2004, 2100, 2400] {
            if let Some(date) = NaiveDate::from_ymd_opt(year, 2, 29) {
                assert_eq!(decode_date(encode_date(date)).unwrap(), date);
            }
            let march = ymd(year, 3, 1);
            assert_eq!(decode_date(encode_date(march)).unwrap(), march);
        }
    }

    #[test]
    fn test_time_round_trip() {
        let samples = [
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_micro_opt(12, 34, 56, 789_100).unwrap(),
            NaiveTime::from_hms_micro_opt(23, 59, 59, 999_900).unwrap(),
        ];
        for time in samples {
            assert_eq!(decode_time(encode_time(time)).unwrap(), time);
        }
        assert_eq!(
            encode_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap()),
            86_399 * 10_000
        );
    }

    #[test]
    fn test_time_truncates_sub_tick() {
        let time = NaiveTime::from_hms_nano_opt(1, 0, 0, 123_456_789).unwrap();
        let decoded = decode_time(encode_time(time)).unwrap();
        assert_eq!(decoded, NaiveTime::from_hms_micro_opt(1, 0, 0, 123_400).unwrap());
    }

    #[test]
    fn test_time_out_of_range() {
        assert!(decode_time(-1).is_err());
        assert!(decode_time(86_400 * 10_000).is_err());
    }

    #[test]
    fn test_timestamp_pair() {
        let ts = ymd(2024, 10, 21).and_hms_opt(12, 36, 5).unwrap();
        let (date, time) = encode_timestamp(ts);
        assert_eq!(decode_timestamp(date, time).unwrap(), ts);
    }
}
