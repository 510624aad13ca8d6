//! DBF table header and column descriptor parsing.
//!
//! # Header Structure
//! ```text
//! [1 byte]  Version (dialect + memo flag)
//! [3 bytes] Last update Y/M/D (year offset from 1900)
//! [4 bytes] Record count (little-endian u32)
//! [2 bytes] Header length (little-endian u16)
//! [2 bytes] Record length (little-endian u16)
//! [16 bytes] Reserved
//! [1 byte]  Table flags
//! [1 byte]  Language driver
//! [2 bytes] Reserved
//! [N x 32 bytes] Column descriptors, terminated by 0x0D
//! ```

use std::io::Read;

use chrono::NaiveDate;
use log::{debug, trace, warn};

use crate::xbase::types::column_types::{actual_type, DbfColumnType, TableDialect};
use crate::xbase::types::error::{Result, XbaseError};
use crate::xbase::types::models::{DbfColumn, DbfHeader, DbfVersionFamily};
use crate::xbase::utils::{self, ByteCursor};

pub const DBF_HEADER_SIZE: usize = 32;
pub const COLUMN_DESCRIPTOR_SIZE: usize = 32;
pub const COLUMN_TERMINATOR: u8 = 0x0D;

/// Parses the fixed 32-byte table header.
///
/// # Errors
/// [`XbaseError::Format`] if fewer than 32 bytes are available.
pub fn parse_header<R: Read>(reader: &mut R) -> Result<DbfHeader> {
    let mut raw = [0u8; DBF_HEADER_SIZE];
    let read = utils::read_fully(reader, &mut raw)?;
    if read < DBF_HEADER_SIZE {
        return Err(XbaseError::Format(format!(
            "DBF header is {} bytes, expected {}",
            read, DBF_HEADER_SIZE
        )));
    }

    let mut cursor = ByteCursor::new(&raw);
    let version = cursor.read_u8()?;
    let year = cursor.read_u8()? as i32 + 1900;
    let month = cursor.read_u8()? as u32;
    let day = cursor.read_u8()? as u32;
    let record_count = cursor.read_u32_le()?;
    let header_length = cursor.read_u16_le()?;
    let record_length = cursor.read_u16_le()?;
    cursor.seek(28)?;
    let table_flags = cursor.read_u8()?;
    let language_driver = cursor.read_u8()?;

    let family = DbfVersionFamily::from_version(version);
    let last_update = NaiveDate::from_ymd_opt(year, month, day);
    if last_update.is_none() {
        debug!("Header last-update bytes {}/{}/{} are not a date", year, month, day);
    }

    trace!(
        "DBF header: version={:#04x}, family={:?}, records={}, header_length={}, record_length={}",
        version, family, record_count, header_length, record_length
    );

    Ok(DbfHeader {
        version,
        last_update,
        record_count,
        header_length,
        record_length,
        table_flags,
        language_driver,
        family,
    })
}

/// Reads one column descriptor.
///
/// Returns `Ok(None)` when the descriptor's first byte is the 0x0D terminator
/// that ends the column list. `offset` is the column's position within the
/// record, counted from the status byte.
pub fn parse_column<R: Read>(
    reader: &mut R,
    dialect: TableDialect,
    index: usize,
    offset: usize,
) -> Result<Option<DbfColumn>> {
    let mut raw = [0u8; COLUMN_DESCRIPTOR_SIZE];
    if utils::read_fully(reader, &mut raw[..1])? == 0 {
        return Err(XbaseError::Format(
            "Column list ends without a 0x0D terminator".to_string(),
        ));
    }
    if raw[0] == COLUMN_TERMINATOR {
        return Ok(None);
    }
    let read = utils::read_fully(reader, &mut raw[1..])?;
    if read < COLUMN_DESCRIPTOR_SIZE - 1 {
        return Err(XbaseError::Format(format!(
            "Column descriptor {} is {} bytes, expected {}",
            index,
            read + 1,
            COLUMN_DESCRIPTOR_SIZE
        )));
    }

    let mut cursor = ByteCursor::new(&raw);
    let name = cursor.read_fixed_ascii_trimmed(11, b" ")?;
    let type_byte = cursor.read_u8()?;
    cursor.skip(4)?; // field data address
    let length = cursor.read_u8()?;
    let decimal_count = cursor.read_u8()?;
    let flags = cursor.read_u8()?;

    let column_type = DbfColumnType::from_byte(type_byte).ok_or(
        XbaseError::UnsupportedColumnType {
            declared: type_byte,
            dialect,
        },
    )?;
    let actual_type = actual_type(column_type, dialect)?;

    trace!(
        "Column {}: name={}, type={:?} -> {:?}, length={}, decimals={}",
        index, name, column_type, actual_type, length, decimal_count
    );

    Ok(Some(DbfColumn {
        index,
        name,
        column_type,
        length,
        decimal_count,
        flags,
        actual_type,
        offset,
    }))
}

/// Reads column descriptors until the terminator.
///
/// Reads at most as many descriptors as `header_length` leaves room for, so a
/// missing terminator cannot run into the record data.
pub fn parse_columns<R: Read>(reader: &mut R, header: &DbfHeader) -> Result<Vec<DbfColumn>> {
    let dialect = header.dialect();
    let max_columns =
        (header.header_length as usize).saturating_sub(DBF_HEADER_SIZE) / COLUMN_DESCRIPTOR_SIZE;

    let mut columns: Vec<DbfColumn> = Vec::new();
    let mut offset = 1;
    while columns.len() < max_columns {
        match parse_column(reader, dialect, columns.len(), offset)? {
            Some(column) => {
                offset += column.data_length();
                columns.push(column);
            }
            None => break,
        }
    }

    if offset != header.record_length as usize {
        warn!(
            "Column widths sum to {} bytes but the header declares records of {} bytes",
            offset, header.record_length
        );
    }
    debug!("Parsed {} column descriptors ({:?} dialect)", columns.len(), dialect);
    Ok(columns)
}
