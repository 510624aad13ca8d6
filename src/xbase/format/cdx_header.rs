//! Compact/compound index header parsing.
//!
//! # Header Structure (1024 bytes, little-endian)
//! ```text
//! [4 bytes]   Root node pointer
//! [4 bytes]   Free list pointer (-1 when empty)
//! [4 bytes]   Reserved
//! [2 bytes]   Key length
//! [1 byte]    Options (0x01 unique, 0x08 FOR clause, 0x20 compact, 0x40 compound)
//! [1 byte]    Signature
//! [486 bytes] Reserved
//! [2 bytes]   Order (0 ascending, 1 descending)
//! [2 bytes]   Reserved
//! [2 bytes]   FOR expression pool length
//! [2 bytes]   Reserved
//! [2 bytes]   Key expression pool length
//! [512 bytes] Key expression followed by FOR expression
//! ```

use std::io::Read;

use log::trace;

use crate::xbase::types::error::{Result, XbaseError};
use crate::xbase::types::index_models::{CdxIndexHeader, CdxOptions, SortOrder, CDX_HEADER_SIZE};
use crate::xbase::utils::{self, ByteCursor};

const EXPRESSION_POOL_OFFSET: usize = 512;
const EXPRESSION_POOL_SIZE: usize = 512;

/// Parses the 1024-byte index header.
///
/// # Errors
/// [`XbaseError::Format`] on a short read or expression lengths that overflow the pool.
pub fn parse<R: Read>(reader: &mut R) -> Result<CdxIndexHeader> {
    let mut raw = vec![0u8; CDX_HEADER_SIZE];
    let read = utils::read_fully(reader, &mut raw)?;
    if read < CDX_HEADER_SIZE {
        return Err(XbaseError::Format(format!(
            "Index header is {} bytes, expected {}",
            read, CDX_HEADER_SIZE
        )));
    }

    let mut cursor = ByteCursor::new(&raw);
    let root_pointer = cursor.read_u32_le()?;
    let free_list_pointer = cursor.read_i32_le()?;
    cursor.skip(4)?;
    let key_length = cursor.read_u16_le()?;
    let options = CdxOptions::from(cursor.read_u8()?);
    let signature = cursor.read_u8()?;
    cursor.skip(486)?;
    let order = match cursor.read_u16_le()? {
        0 => SortOrder::Ascending,
        _ => SortOrder::Descending,
    };
    cursor.skip(2)?;
    let for_expression_length = cursor.read_u16_le()?;
    cursor.skip(2)?;
    let key_expression_length = cursor.read_u16_le()?;

    let key_len = key_expression_length as usize;
    let for_len = for_expression_length as usize;
    if key_len + for_len > EXPRESSION_POOL_SIZE {
        return Err(XbaseError::Format(format!(
            "Expression lengths {} + {} overflow the {}-byte pool",
            key_len, for_len, EXPRESSION_POOL_SIZE
        )));
    }

    cursor.seek(EXPRESSION_POOL_OFFSET)?;
    let key_expression = cursor.read_fixed_ascii_trimmed(key_len, b" ")?;
    let for_expression = if for_len > 0 {
        Some(cursor.read_fixed_ascii_trimmed(for_len, b" ")?)
    } else {
        None
    };

    trace!(
        "Index header: root={:#x}, key_length={}, options={:?}, order={:?}, key='{}'",
        root_pointer, key_length, options, order, key_expression
    );

    Ok(CdxIndexHeader {
        root_pointer,
        free_list_pointer,
        key_length,
        options,
        signature,
        order,
        for_expression_length,
        key_expression_length,
        key_expression,
        for_expression,
    })
}
