//! Declared column types, their dialect-resolved wire representations, and the
//! mapping between the two.
//!
//! The one-byte type code stored in a column descriptor is overloaded across
//! xBase dialects: `B` is a binary memo in dBase but an 8-byte double in FoxPro,
//! and a FoxPro `C` column borrows the decimal-count byte as the high byte of
//! its length. [`actual_type`] resolves a `(declared, dialect)` pair to the
//! concrete [`ActualColumnType`] the value codec dispatches on.

use super::error::{Result, XbaseError};

/// The family of xBase writers a table belongs to, as far as column decoding is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableDialect {
    /// Version byte not attributable to a specific family (e.g. FoxBase).
    Generic,
    /// FoxPro 2.x and Visual FoxPro.
    FoxPro,
    /// dBase III, IV and V.
    DBase,
}

/// The on-disk column type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbfColumnType {
    /// `C`
    Character,
    /// `N`
    Numeric,
    /// `F`
    Float,
    /// `I`
    Integer,
    /// `Y`
    Currency,
    /// `D`
    Date,
    /// `T`
    DateTime,
    /// `@`
    Timestamp,
    /// `L`
    Logical,
    /// `M`
    Memo,
    /// `B`: double in FoxPro, binary memo in dBase.
    DoubleOrBinary,
    /// `G`
    General,
    /// `P`
    Picture,
    /// `O`
    Double,
    /// `+`
    AutoIncrement,
    /// `V`
    Varchar,
    /// `Q`
    Varbinary,
    /// `W`
    Blob,
    /// `0`: Visual FoxPro `_NullFlags` system column.
    NullFlags,
}

impl DbfColumnType {
    /// Maps the raw type byte to a declared type, or `None` for unknown codes.
    pub fn from_byte(byte: u8) -> Option<Self> {
        let column_type = match byte {
            b'C' => Self::Character,
            b'N' => Self::Numeric,
            b'F' => Self::Float,
            b'I' => Self::Integer,
            b'Y' => Self::Currency,
            b'D' => Self::Date,
            b'T' => Self::DateTime,
            b'@' => Self::Timestamp,
            b'L' => Self::Logical,
            b'M' => Self::Memo,
            b'B' => Self::DoubleOrBinary,
            b'G' => Self::General,
            b'P' => Self::Picture,
            b'O' => Self::Double,
            b'+' => Self::AutoIncrement,
            b'V' => Self::Varchar,
            b'Q' => Self::Varbinary,
            b'W' => Self::Blob,
            b'0' => Self::NullFlags,
            _ => return None,
        };
        Some(column_type)
    }

    pub fn as_byte(&self) -> u8 {
        match self {
            Self::Character => b'C',
            Self::Numeric => b'N',
            Self::Float => b'F',
            Self::Integer => b'I',
            Self::Currency => b'Y',
            Self::Date => b'D',
            Self::DateTime => b'T',
            Self::Timestamp => b'@',
            Self::Logical => b'L',
            Self::Memo => b'M',
            Self::DoubleOrBinary => b'B',
            Self::General => b'G',
            Self::Picture => b'P',
            Self::Double => b'O',
            Self::AutoIncrement => b'+',
            Self::Varchar => b'V',
            Self::Varbinary => b'Q',
            Self::Blob => b'W',
            Self::NullFlags => b'0',
        }
    }
}

/// The concrete wire representation a column's bytes are decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActualColumnType {
    BooleanText,
    NumberText,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    /// Little-endian int64 scaled by 10^4.
    Currency,
    FloatSingle,
    FloatDouble,
    Text,
    /// Text whose 16-bit length is `(decimal_count << 8) | length`.
    TextLong,
    DateText,
    DateTimeBinaryJulian,
    ByteArray,
    MemoByteArray,
    MemoText,
}

impl ActualColumnType {
    /// Fixed wire width of the type, or `None` when the width comes from the column.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Self::BooleanText => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::FloatSingle => Some(4),
            Self::Int64 | Self::UInt64 | Self::Currency | Self::FloatDouble => Some(8),
            Self::DateText | Self::DateTimeBinaryJulian => Some(8),
            Self::NumberText
            | Self::Text
            | Self::TextLong
            | Self::ByteArray
            | Self::MemoByteArray
            | Self::MemoText => None,
        }
    }
}

/// Resolves a declared column type to its wire representation for a dialect.
///
/// # Errors
/// [`XbaseError::UnsupportedColumnType`] when the dialect has no decoding for the code.
pub fn actual_type(declared: DbfColumnType, dialect: TableDialect) -> Result<ActualColumnType> {
    use ActualColumnType as A;
    use DbfColumnType as D;

    let resolved = match (dialect, declared) {
        (TableDialect::FoxPro, D::Character) => Some(A::TextLong),
        // Visual FoxPro stores `B` as an 8-byte double.
        (TableDialect::FoxPro, D::DoubleOrBinary) => Some(A::FloatDouble),
        (TableDialect::FoxPro, D::Currency) => Some(A::Currency),
        (TableDialect::FoxPro, D::DateTime) => Some(A::DateTimeBinaryJulian),
        (TableDialect::FoxPro, D::Varchar) => Some(A::Text),
        (TableDialect::FoxPro, D::Varbinary | D::Blob | D::NullFlags) => Some(A::ByteArray),
        (TableDialect::FoxPro, D::General | D::Picture) => Some(A::MemoByteArray),
        (TableDialect::FoxPro, D::Timestamp | D::Double | D::AutoIncrement) => None,

        (TableDialect::DBase | TableDialect::Generic, D::DoubleOrBinary) => Some(A::MemoByteArray),
        (TableDialect::DBase | TableDialect::Generic, D::Timestamp) => {
            Some(A::DateTimeBinaryJulian)
        }
        (TableDialect::DBase | TableDialect::Generic, D::Double) => Some(A::FloatDouble),
        (TableDialect::DBase | TableDialect::Generic, D::AutoIncrement) => Some(A::UInt32),
        (TableDialect::DBase | TableDialect::Generic, D::General) => Some(A::MemoByteArray),
        (
            TableDialect::DBase | TableDialect::Generic,
            D::Currency
            | D::DateTime
            | D::Picture
            | D::Varchar
            | D::Varbinary
            | D::Blob
            | D::NullFlags,
        ) => None,

        (_, D::Character) => Some(A::Text),
        (_, D::Numeric | D::Float) => Some(A::NumberText),
        (_, D::Integer) => Some(A::Int32),
        (_, D::Date) => Some(A::DateText),
        (_, D::Logical) => Some(A::BooleanText),
        (_, D::Memo) => Some(A::MemoText),
    };

    resolved.ok_or(XbaseError::UnsupportedColumnType {
        declared: declared.as_byte(),
        dialect,
    })
}
