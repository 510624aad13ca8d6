//! Core data structures for DBF table components.
//!
//! This module defines the decoded forms of the on-disk structures:
//! - The 32-byte table header and its derived dialect information
//! - Column descriptors
//! - Decoded records and their typed values

use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};

use super::column_types::{ActualColumnType, DbfColumnType, TableDialect};

/// Version bytes written by FoxPro and Visual FoxPro.
pub const FOXPRO_VERSIONS: [u8; 4] = [0x30, 0x31, 0xF5, 0xFB];

/// Writer family derived from the header's version byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbfVersionFamily {
    FoxBase,
    DBase3,
    DBase4,
    DBase5,
    FoxPro,
    Unknown,
}

impl DbfVersionFamily {
    pub fn from_version(version: u8) -> Self {
        if FOXPRO_VERSIONS.contains(&version) {
            return Self::FoxPro;
        }
        match version & 0x07 {
            2 => Self::FoxBase,
            3 => Self::DBase3,
            4 => Self::DBase4,
            5 => Self::DBase5,
            _ => Self::Unknown,
        }
    }

    pub fn dialect(&self) -> TableDialect {
        match self {
            Self::FoxPro => TableDialect::FoxPro,
            Self::DBase3 | Self::DBase4 | Self::DBase5 => TableDialect::DBase,
            Self::FoxBase | Self::Unknown => TableDialect::Generic,
        }
    }
}

/// Parsed 32-byte DBF table header.
///
/// Created once per open table; governs column decoding and the record layout.
#[derive(Debug, Clone)]
pub struct DbfHeader {
    pub version: u8,
    /// `None` when the stored Y/M/D bytes do not form a calendar date.
    pub last_update: Option<NaiveDate>,
    pub record_count: u32,
    pub header_length: u16,
    /// Length of one record including its status byte.
    pub record_length: u16,
    /// Byte 28: 0x01 structural CDX, 0x02 memo, 0x04 database container.
    pub table_flags: u8,
    /// Byte 29: code page identifier.
    pub language_driver: u8,
    pub family: DbfVersionFamily,
}

impl DbfHeader {
    pub fn is_foxpro(&self) -> bool {
        self.family == DbfVersionFamily::FoxPro
    }

    pub fn dialect(&self) -> TableDialect {
        self.family.dialect()
    }

    /// Whether the table declares a companion memo file.
    pub fn has_memo(&self) -> bool {
        match self.family {
            DbfVersionFamily::FoxPro => self.version == 0xF5 || self.table_flags & 0x02 != 0,
            _ => self.version & 0x80 != 0,
        }
    }

    pub fn has_structural_index(&self) -> bool {
        self.table_flags & 0x01 != 0
    }

    /// Bytes of column data following each record's status byte.
    pub fn record_data_length(&self) -> usize {
        (self.record_length as usize).saturating_sub(1)
    }
}

/// A single column descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbfColumn {
    /// 0-based position in the table.
    pub index: usize,
    pub name: String,
    pub column_type: DbfColumnType,
    pub length: u8,
    /// Decimal digits for numeric columns, or the high length byte for long text.
    pub decimal_count: u8,
    /// Byte 18 of the descriptor (Visual FoxPro field flags).
    pub flags: u8,
    pub actual_type: ActualColumnType,
    /// Offset of the column's first byte relative to the record's status byte.
    pub offset: usize,
}

impl DbfColumn {
    /// Number of bytes this column occupies in every record.
    pub fn data_length(&self) -> usize {
        match self.actual_type {
            ActualColumnType::TextLong => ((self.decimal_count as usize) << 8) | self.length as usize,
            _ => self.length as usize,
        }
    }

    /// Hidden system column such as `_NullFlags`.
    pub fn is_system(&self) -> bool {
        self.flags & 0x01 != 0
    }
}

/// Status byte found at the start of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Valid,
    Deleted,
    EofMarker,
    Unknown(u8),
}

impl From<u8> for RecordStatus {
    fn from(byte: u8) -> Self {
        match byte {
            0x20 => Self::Valid,
            0x2A => Self::Deleted,
            0x1A => Self::EofMarker,
            other => Self::Unknown(other),
        }
    }
}

/// Policy for records whose status is not [`RecordStatus::Valid`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DbfReadOptions {
    /// Treat a 0x1A status byte as a skippable record instead of the end of data.
    pub ignore_eof_marker: bool,
    /// Surface deleted records instead of skipping them.
    pub allow_deleted: bool,
    /// Surface records with an unrecognized status byte instead of skipping them.
    pub allow_invalid: bool,
}

/// A decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum DbfValue {
    Null,
    Boolean(bool),
    Decimal(BigDecimal),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Bytes(Vec<u8>),
    /// Block number of a memo stored in the companion memo file.
    MemoPointer(u64),
}

impl DbfValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DbfValue::Null)
    }
}

impl fmt::Display for DbfValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbfValue::Null => Ok(()),
            DbfValue::Boolean(v) => write!(f, "{}", v),
            DbfValue::Decimal(v) => write!(f, "{}", v),
            DbfValue::Int16(v) => write!(f, "{}", v),
            DbfValue::UInt16(v) => write!(f, "{}", v),
            DbfValue::Int32(v) => write!(f, "{}", v),
            DbfValue::UInt32(v) => write!(f, "{}", v),
            DbfValue::Int64(v) => write!(f, "{}", v),
            DbfValue::UInt64(v) => write!(f, "{}", v),
            DbfValue::Float(v) => write!(f, "{}", v),
            DbfValue::Double(v) => write!(f, "{}", v),
            DbfValue::Text(v) => f.write_str(v),
            DbfValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            DbfValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S%.3f")),
            DbfValue::Bytes(v) => {
                for byte in v {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            DbfValue::MemoPointer(v) => write!(f, "<memo {}>", v),
        }
    }
}

/// One decoded row.
///
/// `values[i]` is `None` when column `i` was not selected for decoding, and
/// `Some(DbfValue::Null)` when it was decoded and holds NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct DbfRecord {
    pub status: RecordStatus,
    /// Absolute file offset of the record's status byte.
    pub offset: u64,
    /// 0-based record number.
    pub index: u64,
    pub values: Vec<Option<DbfValue>>,
}

impl DbfRecord {
    pub fn is_deleted(&self) -> bool {
        self.status == RecordStatus::Deleted
    }

    /// The decoded value of column `index`, or `None` if it was not decoded.
    pub fn get(&self, index: usize) -> Option<&DbfValue> {
        self.values.get(index).and_then(Option::as_ref)
    }
}
