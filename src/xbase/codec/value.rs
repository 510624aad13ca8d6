//! Field value decoding.
//!
//! [`read_value`] dispatches on a column's [`ActualColumnType`] and turns the
//! column's bytes into a [`DbfValue`]. Column shape checks run before any byte
//! is consumed, so a rejected column leaves the cursor where it was.
//!
//! | Actual type            | Wire bytes              | Decoded form            |
//! |------------------------|-------------------------|-------------------------|
//! | `BooleanText`          | 1                       | bool or NULL            |
//! | `NumberText`           | column length, ASCII    | decimal or NULL         |
//! | `Int16`..`UInt64`      | 2/2/4/4/8/8 LE          | integer                 |
//! | `Currency`             | 8 LE                    | decimal, 4 places       |
//! | `FloatSingle/Double`   | 4/8 LE                  | IEEE float              |
//! | `Text` / `TextLong`    | column length           | string, right-trimmed   |
//! | `DateText`             | 8 ASCII `yyyyMMdd`      | date or NULL            |
//! | `DateTimeBinaryJulian` | days LE i32 + ms LE i32 | datetime                |
//! | `ByteArray`            | column length           | raw bytes               |
//! | `Memo*`                | 10 ASCII or 4 LE        | memo block pointer      |

use std::str::FromStr;

use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use encoding_rs::Encoding;

use crate::xbase::types::column_types::ActualColumnType;
use crate::xbase::types::error::{Result, XbaseError};
use crate::xbase::types::models::{DbfColumn, DbfValue};
use crate::xbase::utils::{trim_bytes, trim_end_bytes, ByteCursor};

/// Julian day number of 1582-10-15, the first day of the Gregorian calendar.
pub const JULIAN_EPOCH_DAY: i32 = 2_299_161;
const MILLISECONDS_PER_DAY: i32 = 86_400_000;
const CURRENCY_SCALE: i64 = 4;

/// Decodes one field of `column` from the cursor.
///
/// # Errors
/// - [`XbaseError::ColumnLengthMismatch`] / [`XbaseError::ColumnDecimalCountMismatch`]
///   when the column's shape does not fit its type (no bytes consumed)
/// - value format errors for malformed booleans, numbers, dates and datetimes
/// - [`XbaseError::TruncatedRead`] when the cursor holds fewer bytes than the column
pub fn read_value(
    column: &DbfColumn,
    cursor: &mut ByteCursor<'_>,
    encoding: &'static Encoding,
) -> Result<DbfValue> {
    use ActualColumnType as A;

    match column.actual_type {
        A::BooleanText => {
            assert_column(column, 1, None)?;
            read_boolean(column, cursor.read_u8()?)
        }
        A::NumberText => {
            let raw = cursor.read_bytes(column.data_length())?;
            read_number_text(column, raw)
        }
        A::Int16 => {
            assert_column(column, 2, Some(0))?;
            Ok(DbfValue::Int16(cursor.read_i16_le()?))
        }
        A::UInt16 => {
            assert_column(column, 2, Some(0))?;
            Ok(DbfValue::UInt16(cursor.read_u16_le()?))
        }
        A::Int32 => {
            assert_column(column, 4, Some(0))?;
            Ok(DbfValue::Int32(cursor.read_i32_le()?))
        }
        A::UInt32 => {
            assert_column(column, 4, Some(0))?;
            Ok(DbfValue::UInt32(cursor.read_u32_le()?))
        }
        A::Int64 => {
            assert_column(column, 8, Some(0))?;
            Ok(DbfValue::Int64(cursor.read_i64_le()?))
        }
        A::UInt64 => {
            assert_column(column, 8, Some(0))?;
            Ok(DbfValue::UInt64(cursor.read_u64_le()?))
        }
        A::Currency => {
            assert_column(column, 8, None)?;
            let scaled = cursor.read_i64_le()?;
            Ok(DbfValue::Decimal(BigDecimal::new(
                BigInt::from(scaled),
                CURRENCY_SCALE,
            )))
        }
        A::FloatSingle => {
            assert_column(column, 4, None)?;
            Ok(DbfValue::Float(cursor.read_f32_le()?))
        }
        A::FloatDouble => {
            assert_column(column, 8, None)?;
            Ok(DbfValue::Double(cursor.read_f64_le()?))
        }
        A::Text | A::TextLong => {
            let raw = cursor.read_bytes(column.data_length())?;
            let (text, _, _) = encoding.decode(trim_end_bytes(raw, b"\0 "));
            Ok(DbfValue::Text(text.into_owned()))
        }
        A::DateText => {
            assert_column(column, 8, None)?;
            read_date_text(column, cursor.read_bytes(8)?)
        }
        A::DateTimeBinaryJulian => {
            assert_column(column, 8, None)?;
            let days = cursor.read_i32_le()?;
            let milliseconds = cursor.read_i32_le()?;
            julian_to_datetime(days, milliseconds)
                .map(DbfValue::DateTime)
                .ok_or_else(|| XbaseError::InvalidDateTime {
                    column: column.name.clone(),
                    days,
                    milliseconds,
                })
        }
        A::ByteArray => Ok(DbfValue::Bytes(
            cursor.read_bytes(column.data_length())?.to_vec(),
        )),
        A::MemoByteArray | A::MemoText => read_memo_pointer(column, cursor),
    }
}

/// Checks a column's shape against what its type requires.
fn assert_column(column: &DbfColumn, length: usize, decimal_count: Option<u8>) -> Result<()> {
    if column.data_length() != length {
        return Err(XbaseError::ColumnLengthMismatch {
            column: column.name.clone(),
            expected: length,
            found: column.data_length(),
        });
    }
    if let Some(expected) = decimal_count {
        if column.decimal_count != expected {
            return Err(XbaseError::ColumnDecimalCountMismatch {
                column: column.name.clone(),
                expected,
                found: column.decimal_count,
            });
        }
    }
    Ok(())
}

fn read_boolean(column: &DbfColumn, byte: u8) -> Result<DbfValue> {
    match byte {
        b'Y' | b'y' | b'T' | b't' => Ok(DbfValue::Boolean(true)),
        b'N' | b'n' | b'F' | b'f' => Ok(DbfValue::Boolean(false)),
        b' ' | b'?' => Ok(DbfValue::Null),
        _ => Err(XbaseError::InvalidBoolean {
            column: column.name.clone(),
            byte,
        }),
    }
}

fn read_number_text(column: &DbfColumn, raw: &[u8]) -> Result<DbfValue> {
    let trimmed = trim_bytes(raw, b" \0");
    if trimmed.is_empty() {
        return Ok(DbfValue::Null);
    }
    std::str::from_utf8(trimmed)
        .ok()
        .and_then(|text| BigDecimal::from_str(text).ok())
        .map(DbfValue::Decimal)
        .ok_or_else(|| XbaseError::InvalidNumber {
            column: column.name.clone(),
            text: String::from_utf8_lossy(raw).into_owned(),
        })
}

fn read_date_text(column: &DbfColumn, raw: &[u8]) -> Result<DbfValue> {
    let trimmed = trim_bytes(raw, b" \0");
    if trimmed.is_empty() {
        return Ok(DbfValue::Null);
    }
    parse_yyyymmdd(trimmed)
        .map(DbfValue::Date)
        .ok_or_else(|| XbaseError::InvalidDate {
            column: column.name.clone(),
            text: String::from_utf8_lossy(raw).into_owned(),
        })
}

fn parse_yyyymmdd(text: &[u8]) -> Option<NaiveDate> {
    if text.len() != 8 || !text.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let number = |range: std::ops::Range<usize>| {
        text[range]
            .iter()
            .fold(0u32, |acc, digit| acc * 10 + (digit - b'0') as u32)
    };
    NaiveDate::from_ymd_opt(number(0..4) as i32, number(4..6), number(6..8))
}

/// Converts a Julian day number and milliseconds since midnight to a datetime.
///
/// Returns `None` for days before [`JULIAN_EPOCH_DAY`] or a time of day outside one day.
pub fn julian_to_datetime(days: i32, milliseconds: i32) -> Option<NaiveDateTime> {
    if days < JULIAN_EPOCH_DAY || !(0..MILLISECONDS_PER_DAY).contains(&milliseconds) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1582, 10, 15)?.and_hms_opt(0, 0, 0)?;
    epoch
        .checked_add_signed(TimeDelta::try_days((days - JULIAN_EPOCH_DAY) as i64)?)?
        .checked_add_signed(TimeDelta::try_milliseconds(milliseconds as i64)?)
}

/// Memo columns hold a block pointer into the companion memo file: ten ASCII
/// digits in dBase tables, a 4-byte little-endian integer in FoxPro tables.
fn read_memo_pointer(column: &DbfColumn, cursor: &mut ByteCursor<'_>) -> Result<DbfValue> {
    let raw = cursor.read_bytes(column.data_length())?;
    if raw.len() == 4 {
        let block = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        return Ok(match block {
            0 => DbfValue::Null,
            block => DbfValue::MemoPointer(block as u64),
        });
    }
    let trimmed = trim_bytes(raw, b" \0");
    if trimmed.is_empty() {
        return Ok(DbfValue::Null);
    }
    std::str::from_utf8(trimmed)
        .ok()
        .and_then(|text| text.parse::<u64>().ok())
        .map(DbfValue::MemoPointer)
        .ok_or_else(|| XbaseError::InvalidNumber {
            column: column.name.clone(),
            text: String::from_utf8_lossy(raw).into_owned(),
        })
}
